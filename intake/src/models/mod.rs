// order_intake/src/models/mod.rs

//! Entities the order intake pipeline reads and writes.

pub mod catalog;
pub mod discount;
pub mod order;
pub mod order_item;
pub mod request;
pub mod shipping;
pub mod stock;

pub use catalog::{CatalogPrice, ResolvedLine};
pub use discount::{DiscountCode, DiscountKind};
pub use order::{NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus};
pub use order_item::{NewOrderLineItem, OrderLineItem};
pub use request::{CheckoutOptions, LineRequest, OrderRequest, ShippingAddress};
pub use shipping::ShippingMethod;
pub use stock::StockKey;

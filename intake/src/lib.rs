// order_intake/src/lib.rs

//! Order intake: server-side pricing, oversell protection, order codes,
//! payment capture with compensation and the transactional order write,
//! exposed over a small actix-web API.

pub mod config;
pub mod errors;
pub mod models;
pub mod order_code;
pub mod pipelines;
pub mod pricing;
pub mod services;
pub mod state;
pub mod stock_guard;
pub mod store;
pub mod web;

pub use errors::{AppError, Result};

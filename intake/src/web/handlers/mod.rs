// order_intake/src/web/handlers/mod.rs

pub mod health;
pub mod orders;

// order_intake/src/services/mod.rs

//! Collaborators the order pipeline talks to through narrow contracts.

pub mod audit;
pub mod mailer;
pub mod notify;
pub mod payment;
pub mod secrets;
pub mod tax;

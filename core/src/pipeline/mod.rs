// stepflow/src/pipeline/mod.rs

pub mod definition;
pub mod execution;
pub mod hooks;

// stepflow/src/core/mod.rs

pub mod context;
pub mod context_data;
pub mod control;
pub mod step;

pub use context_data::ContextData;

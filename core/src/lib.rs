// src/lib.rs

//! Stepflow: an async, type-safe step pipeline with compensation.
//!
//! A pipeline is an ordered list of named steps. Each step may carry
//! `before`, `on` and `after` handlers that operate on a shared
//! [`ContextData<T>`], and an optional compensator. Handlers can stop the
//! pipeline early; when a handler fails, the compensators of every step that
//! was entered run in reverse order before the error is returned.
//!
//! This gives callers the "reserve, commit, compensate on commit failure"
//! shape without hand-writing the unwinding at each call site:
//!
//!  1. Define a context struct `MyCtx`.
//!  2. Create a `Pipeline<MyCtx, MyError>` with its step definitions.
//!  3. Register handlers with `.on_root()`, `.before_root()`, `.after_root()`.
//!  4. Register undo logic for side-effecting steps with `.on_compensate()`.
//!  5. Call `pipeline.run(ContextData::new(ctx)).await`.

pub mod core;
pub mod error;
pub mod pipeline;

pub use crate::core::context::{Compensator, Handler};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

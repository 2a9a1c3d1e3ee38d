// stepflow/src/core/context.rs

//! Boxed handler types stored by a pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler.
///
/// Takes a clone of the shared context and resolves to the control signal for
/// the pipeline. Handlers must release any lock guard before awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Undo logic for a step, run when the step or a later one fails.
///
/// A compensator reads the context to find out what its step actually did and
/// must be a no-op when there is nothing to undo.
pub type Compensator<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>> + Send + Sync>;

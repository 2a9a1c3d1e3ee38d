// stepflow/src/pipeline/execution.rs

//! `Pipeline::run()`: step execution and compensation unwinding.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

enum StepOutcome {
  Skipped,
  Finished,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// On the first handler error, the compensators of every step entered so
  /// far (the failing one included) run once each, newest first, and the
  /// original error is returned. A failing compensator is logged and does
  /// not stop the others.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut entered: Vec<&str> = Vec::with_capacity(self.steps.len());

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(parent: &step_span, Level::INFO, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }
      entered.push(step_def.name.as_str());

      match self.run_step(step_def, &ctx_data).instrument(step_span).await {
        Ok(StepOutcome::Skipped) | Ok(StepOutcome::Finished) => {}
        Ok(StepOutcome::Stopped) => {
          event!(Level::INFO, step_name = %step_def.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        Err(e) => {
          event!(Level::WARN, step_name = %step_def.name, error = %e, "Step failed, compensating.");
          self.compensate(&entered, &ctx_data).await;
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<StepOutcome, Err> {
    let name = step_def.name.as_str();
    let phases = [
      ("before", self.before.get(name)),
      ("on", self.on.get(name)),
      ("after", self.after.get(name)),
    ];

    let has_handlers = phases.iter().any(|&(_, hs)| hs.map_or(false, |v| !v.is_empty()));
    if !has_handlers {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(StepOutcome::Skipped);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase, handlers) in phases {
      let Some(handlers) = handlers else { continue };
      if Self::run_phase(phase, handlers, ctx_data).await? == PipelineControl::Stop {
        return Ok(StepOutcome::Stopped);
      }
    }

    event!(Level::DEBUG, "Step processing finished successfully.");
    Ok(StepOutcome::Finished)
  }

  async fn run_phase(
    phase: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      let handler_span = info_span!("handler", phase, handler_index = handler_idx);
      match handler_fn(ctx_data.clone()).instrument(handler_span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
        Err(e) => {
          event!(Level::ERROR, phase, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  async fn compensate(&self, entered: &[&str], ctx_data: &ContextData<TData>) {
    for step_name in entered.iter().rev() {
      let Some(compensator) = self.compensators.get(*step_name) else {
        continue;
      };
      let span = info_span!("compensation", step_name = *step_name);
      match compensator(ctx_data.clone()).instrument(span).await {
        Ok(()) => event!(Level::INFO, %step_name, "Compensation finished."),
        Err(e) => event!(Level::ERROR, %step_name, error = %e, "Compensation failed."),
      }
    }
  }
}

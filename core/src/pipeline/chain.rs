// stepline/src/pipeline/chain.rs

//! Folds the ordered lazy steps into a single continuation chain.
//!
//! The chain is built right to left: the terminal continuation does nothing and succeeds,
//! and each step wraps the continuation built before it. Running the outermost continuation
//! runs the whole pipeline.

use crate::core::context_data::ContextData;
use crate::core::next::{Continuation, ExecutionTrace, Next, StepFuture};
use crate::core::type_name::short_type_name;
use crate::diagnostics::PipelineDiagnostics;
use crate::error::{PipelineError, StepResult};
use crate::pipeline::lazy::LazyStep;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{event, span, Instrument, Level};

pub(crate) fn compose<T>(steps: &[LazyStep<T>], diagnostics: Arc<dyn PipelineDiagnostics<T>>) -> Continuation<T>
where
  T: Send + Sync + 'static,
{
  let terminal: Continuation<T> = Arc::new(
    |_ctx: ContextData<T>, _cancel: CancellationToken, _trace: ExecutionTrace| -> StepFuture {
      Box::pin(async { Ok(()) })
    },
  );

  steps.iter().rev().fold(terminal, |previous, handle| {
    let handle = handle.clone();
    let diagnostics = diagnostics.clone();
    let link: Continuation<T> = Arc::new(
      move |ctx: ContextData<T>, cancel: CancellationToken, trace: ExecutionTrace| -> StepFuture {
        Box::pin(run_step(
          handle.clone(),
          previous.clone(),
          diagnostics.clone(),
          ctx,
          cancel,
          trace,
        ))
      },
    );
    link
  })
}

async fn run_step<T>(
  handle: LazyStep<T>,
  previous: Continuation<T>,
  diagnostics: Arc<dyn PipelineDiagnostics<T>>,
  ctx: ContextData<T>,
  cancel: CancellationToken,
  trace: ExecutionTrace,
) -> StepResult
where
  T: Send + Sync + 'static,
{
  let step = handle.get();
  let order = handle.order();

  let step_span = span!(
    Level::INFO,
    "pipeline_step",
    context_type = %short_type_name::<T>(),
    step_name = %step.name(),
    step_order = order,
  );

  async move {
    let mut scope = diagnostics.begin_step(step.as_ref(), order);
    let scope_span = scope.span();

    async move {
      if cancel.is_cancelled() {
        scope.set_canceled();
        event!(Level::DEBUG, "Cancellation requested; pipeline step not started.");
        return Err(PipelineError::Canceled);
      }

      let next = Next::new(previous, trace.clone());
      let invoked = next.invoked_flag();
      let started = Instant::now();

      event!(Level::TRACE, "Executing pipeline step.");
      let result = step.execute(ctx, next, cancel).await;
      let elapsed_ms = started.elapsed().as_millis() as u64;

      match result {
        Ok(()) => {
          if invoked.load(Ordering::Acquire) {
            event!(Level::TRACE, elapsed_ms, "Completed pipeline step.");
            scope.set_short_circuited(false);
          } else {
            event!(Level::INFO, elapsed_ms, "Pipeline short-circuited by step.");
            scope.set_short_circuited(true);
            trace.record_short_circuit(step.name(), order);
          }
          Ok(())
        }
        Err(PipelineError::Canceled) => {
          scope.set_canceled();
          event!(Level::DEBUG, elapsed_ms, "Pipeline step canceled.");
          Err(PipelineError::Canceled)
        }
        // Already attributed to a step further down the chain (or deliberately re-raised).
        Err(err @ PipelineError::Execution { .. }) => Err(err),
        Err(err) => {
          diagnostics.report_error(&err, step.as_ref(), order);
          event!(Level::ERROR, error = %err, elapsed_ms, "Exception in pipeline step.");
          Err(PipelineError::Execution {
            step_name: step.name().to_string(),
            step_order: order,
            source: err.into_cause(),
          })
        }
      }
    }
    .instrument(scope_span)
    .await
  }
  .instrument(step_span)
  .await
}

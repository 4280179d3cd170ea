// stepline/src/core/step.rs

//! Defines the `PipelineStep<T>` contract every pipeline component implements.

use crate::core::context_data::ContextData;
use crate::core::next::Next;
use crate::error::StepResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A single unit of pipeline work operating on a context of type `T`.
///
/// A step receives the shared context, the continuation for the rest of the chain, and the
/// cancellation signal. It may:
///  - do its work and call `next.run(ctx, cancel).await` to continue the chain,
///  - return `Ok(())` without calling `next` to short-circuit the remaining steps,
///  - return an error to abort the pipeline.
///
/// The descriptive metadata (`description`, `may_short_circuit`, `short_circuit_condition`) is
/// informational only; the engine decides whether a step short-circuited by observing whether
/// it invoked `next`.
#[async_trait]
pub trait PipelineStep<T>: Send + Sync
where
  T: Send + Sync + 'static,
{
  /// Human-readable name used in logs, diagnostics and error reports.
  /// Should be unique within a pipeline; the engine does not enforce it.
  fn name(&self) -> &str;

  fn description(&self) -> Option<&str> {
    None
  }

  /// Declarative hint that this step may stop the pipeline early.
  fn may_short_circuit(&self) -> bool {
    false
  }

  /// Explanation of when the step short-circuits.
  fn short_circuit_condition(&self) -> Option<&str> {
    None
  }

  async fn execute(&self, ctx: ContextData<T>, next: Next<T>, cancel: CancellationToken) -> StepResult;
}

impl<T: Send + Sync + 'static> std::fmt::Debug for dyn PipelineStep<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineStep")
      .field("name", &self.name())
      .field("description", &self.description())
      .field("may_short_circuit", &self.may_short_circuit())
      .finish()
  }
}

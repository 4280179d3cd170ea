// stepline/src/pipeline/runner.rs

//! `PipelineRunner<T>`: the composed, immutable pipeline for one context type.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineOutcome;
use crate::core::next::{Continuation, ExecutionTrace};
use crate::core::step::PipelineStep;
use crate::core::type_name::pipeline_label;
use crate::diagnostics::{NoopDiagnostics, PipelineDiagnostics};
use crate::error::PipelineError;
use crate::pipeline::chain::compose;
use crate::pipeline::lazy::LazyStep;
use crate::pipeline::resolver::StepResolver;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

/// Executes an ordered set of lazily constructed steps as one continuation chain.
///
/// The chain is composed once, at construction. Steps are constructed on first use and
/// reused by every later `execute` call on this runner.
///
/// `P` names the pipeline. It defaults to `()`, the one default pipeline of a context type;
/// a marker type lets the same context type carry several independent pipelines.
pub struct PipelineRunner<T: Send + Sync + 'static, P: 'static = ()> {
  pub(crate) steps: Vec<LazyStep<T>>,
  chain: Continuation<T>,
  _pipeline: PhantomData<fn() -> P>,
}

impl<T: Send + Sync + 'static> PipelineRunner<T> {
  /// Builds a runner over `steps`, in the given order, reporting to no diagnostics sink.
  pub fn new(steps: impl IntoIterator<Item = LazyStep<T>>) -> Self {
    Self::with_diagnostics(steps, Arc::new(NoopDiagnostics))
  }

  pub fn with_diagnostics(
    steps: impl IntoIterator<Item = LazyStep<T>>,
    diagnostics: Arc<dyn PipelineDiagnostics<T>>,
  ) -> Self {
    Self::for_pipeline(steps, diagnostics)
  }

  /// Builds a runner from bare factories; each step's order is its position.
  pub fn from_factories<I, F>(factories: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Fn() -> Arc<dyn PipelineStep<T>> + Send + Sync + 'static,
  {
    Self::new(
      factories
        .into_iter()
        .enumerate()
        .map(|(position, factory)| LazyStep::from_factory(position as i32, Arc::new(factory))),
    )
  }
}

impl<T: Send + Sync + 'static, P: 'static> PipelineRunner<T, P> {
  /// Builds the runner of pipeline `P` over `steps`, in the given order.
  pub fn for_pipeline(
    steps: impl IntoIterator<Item = LazyStep<T>>,
    diagnostics: Arc<dyn PipelineDiagnostics<T>>,
  ) -> Self {
    let steps: Vec<LazyStep<T>> = steps.into_iter().collect();
    let chain = compose(&steps, diagnostics);
    event!(
      Level::DEBUG,
      pipeline = %pipeline_label::<T, P>(),
      num_steps = steps.len(),
      "Composed pipeline."
    );
    Self {
      steps,
      chain,
      _pipeline: PhantomData,
    }
  }

  /// Builds a runner from the handles a resolver hands out for pipeline `P`.
  pub fn from_resolver<R>(resolver: &R, diagnostics: Arc<dyn PipelineDiagnostics<T>>) -> Self
  where
    R: StepResolver<T, P> + ?Sized,
  {
    Self::for_pipeline(resolver.resolve(), diagnostics)
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Runs every step against `ctx`, in order.
  ///
  /// Returns the outcome on success. A step failure surfaces as `PipelineError::Execution`
  /// naming the failing step. An observed cancellation surfaces as `PipelineError::Canceled`.
  #[instrument(
    name = "PipelineRunner::execute",
    skip_all,
    fields(
      pipeline = %pipeline_label::<T, P>(),
      num_steps = self.steps.len(),
    )
  )]
  pub async fn execute(&self, ctx: ContextData<T>, cancel: &CancellationToken) -> Result<PipelineOutcome, PipelineError> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let trace = ExecutionTrace::default();

    match (self.chain)(ctx, cancel.clone(), trace.clone()).await {
      Ok(()) => {}
      Err(err) if err.is_canceled() => {
        event!(Level::DEBUG, "Pipeline execution canceled.");
        return Err(err);
      }
      Err(err) => {
        event!(Level::ERROR, error = %err, "Pipeline execution failed.");
        return Err(err);
      }
    }

    let outcome = match trace.take_short_circuit() {
      Some((step_name, step_order)) => PipelineOutcome::ShortCircuited { step_name, step_order },
      None => PipelineOutcome::Completed,
    };
    event!(Level::DEBUG, ?outcome, "Pipeline execution finished.");
    Ok(outcome)
  }
}

impl<T: Send + Sync + 'static, P: 'static> std::fmt::Debug for PipelineRunner<T, P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineRunner")
      .field("pipeline", &pipeline_label::<T, P>())
      .field("steps", &self.steps)
      .finish()
  }
}

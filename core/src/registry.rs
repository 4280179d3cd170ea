// stepline/src/registry.rs

//! A type-keyed registry of pipeline runners, one per (context type, pipeline) pair.
//!
//! Lets a host hold the runners for all its context types in one place and dispatch by type,
//! including from code that only has a type-erased context. A context type may carry several
//! independent pipelines, each named by a marker type; `()` is its default pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineOutcome;
use crate::core::type_name::pipeline_label;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::describe::StepDescription;
use crate::pipeline::runner::PipelineRunner;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

/// Type-erased view of a `PipelineRunner<T>`.
#[async_trait]
trait AnyPipelineRunner: Send + Sync {
  fn label(&self) -> String;

  fn descriptions(&self) -> Vec<StepDescription>;

  /// `ctx_obj` is expected to hold a `ContextData<T>` for the wrapped runner's `T`.
  async fn execute_erased(
    &self,
    ctx_obj: Box<dyn Any + Send>,
    cancel: &CancellationToken,
  ) -> Result<PipelineOutcome, PipelineError>;
}

struct RunnerWrapper<T: Send + Sync + 'static, P: 'static> {
  runner: Arc<PipelineRunner<T, P>>,
}

#[async_trait]
impl<T: Send + Sync + 'static, P: 'static> AnyPipelineRunner for RunnerWrapper<T, P> {
  fn label(&self) -> String {
    pipeline_label::<T, P>()
  }

  fn descriptions(&self) -> Vec<StepDescription> {
    self.runner.descriptions()
  }

  #[instrument(
    name = "RunnerWrapper::execute_erased",
    skip_all,
    fields(pipeline = %pipeline_label::<T, P>())
  )]
  async fn execute_erased(
    &self,
    ctx_obj: Box<dyn Any + Send>,
    cancel: &CancellationToken,
  ) -> Result<PipelineOutcome, PipelineError> {
    event!(Level::TRACE, "Attempting to downcast owned context object.");

    let ctx = match ctx_obj.downcast::<ContextData<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<T>>().to_string();
        event!(Level::ERROR, %expected_type, "Context object type mismatch.");
        return Err(PipelineError::TypeMismatch { expected_type });
      }
    };

    self.runner.execute(ctx, cancel).await
  }
}

/// Lookup key: the context type and the pipeline marker.
type RunnerKey = (TypeId, TypeId);

fn key_of<T: 'static, P: 'static>() -> RunnerKey {
  (TypeId::of::<T>(), TypeId::of::<P>())
}

/// Holds at most one `PipelineRunner<T, P>` per context type `T` and pipeline `P`.
pub struct RunnerRegistry {
  runners: Mutex<HashMap<RunnerKey, Arc<dyn AnyPipelineRunner>>>,
}

impl RunnerRegistry {
  pub fn new() -> Self {
    Self {
      runners: Mutex::new(HashMap::new()),
    }
  }

  /// Fails with `RunnerAlreadyRegistered` if a runner for `T` and `P` is already held.
  pub fn register<T, P>(&self, runner: PipelineRunner<T, P>) -> PipelineResult<()>
  where
    T: Send + Sync + 'static,
    P: 'static,
  {
    let pipeline = pipeline_label::<T, P>();
    let mut runners = self.runners.lock();
    if runners.contains_key(&key_of::<T, P>()) {
      event!(Level::WARN, %pipeline, "Pipeline runner already registered.");
      return Err(PipelineError::RunnerAlreadyRegistered { context_type: pipeline });
    }
    event!(Level::DEBUG, %pipeline, num_steps = runner.len(), "Registering pipeline runner.");
    runners.insert(
      key_of::<T, P>(),
      Arc::new(RunnerWrapper {
        runner: Arc::new(runner),
      }),
    );
    Ok(())
  }

  /// Whether the default pipeline of `T` is registered.
  pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
    self.contains_pipeline::<(), T>()
  }

  pub fn contains_pipeline<P: 'static, T: Send + Sync + 'static>(&self) -> bool {
    self.runners.lock().contains_key(&key_of::<T, P>())
  }

  pub fn len(&self) -> usize {
    self.runners.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.runners.lock().is_empty()
  }

  fn lookup(&self, key: RunnerKey, pipeline: impl FnOnce() -> String) -> PipelineResult<Arc<dyn AnyPipelineRunner>> {
    // Clone the runner out so the lock is not held across the await.
    let found = self.runners.lock().get(&key).cloned();
    found.ok_or_else(|| {
      let context_type = pipeline();
      event!(Level::ERROR, pipeline = %context_type, "No pipeline runner registered.");
      PipelineError::RunnerNotRegistered { context_type }
    })
  }

  /// Runs the default pipeline registered for `T`.
  pub async fn execute<T>(&self, ctx: ContextData<T>, cancel: &CancellationToken) -> Result<PipelineOutcome, PipelineError>
  where
    T: Send + Sync + 'static,
  {
    self.execute_pipeline::<(), T>(ctx, cancel).await
  }

  /// Runs pipeline `P` registered for `T`, e.g. `registry.execute_pipeline::<Refunds, _>(ctx, &cancel)`.
  pub async fn execute_pipeline<P, T>(
    &self,
    ctx: ContextData<T>,
    cancel: &CancellationToken,
  ) -> Result<PipelineOutcome, PipelineError>
  where
    P: 'static,
    T: Send + Sync + 'static,
  {
    event!(Level::DEBUG, pipeline = %pipeline_label::<T, P>(), "Dispatching pipeline execution.");
    let runner = self.lookup(key_of::<T, P>(), pipeline_label::<T, P>)?;
    runner.execute_erased(Box::new(ctx), cancel).await
  }

  /// Runs the default pipeline registered under the context type `type_id` with a
  /// type-erased context.
  ///
  /// `ctx` must hold a `ContextData<T>` for that runner's `T`; anything else fails with
  /// `TypeMismatch`.
  pub async fn execute_erased(
    &self,
    type_id: TypeId,
    ctx: Box<dyn Any + Send>,
    cancel: &CancellationToken,
  ) -> Result<PipelineOutcome, PipelineError> {
    self
      .execute_erased_pipeline(type_id, TypeId::of::<()>(), ctx, cancel)
      .await
  }

  /// Type-erased dispatch to the pipeline keyed by `pipeline_id` for the context type `type_id`.
  pub async fn execute_erased_pipeline(
    &self,
    type_id: TypeId,
    pipeline_id: TypeId,
    ctx: Box<dyn Any + Send>,
    cancel: &CancellationToken,
  ) -> Result<PipelineOutcome, PipelineError> {
    let runner = self.lookup((type_id, pipeline_id), || format!("{:?}/{:?}", type_id, pipeline_id))?;
    runner.execute_erased(ctx, cancel).await
  }

  /// A JSON object mapping each registered pipeline to its step descriptions. Default
  /// pipelines are keyed by context type name, others by `Context/Pipeline`.
  pub fn describe_all(&self) -> Result<String, PipelineError> {
    let runners: Vec<Arc<dyn AnyPipelineRunner>> = self.runners.lock().values().cloned().collect();

    let mut described = Map::new();
    for runner in runners {
      let steps = serde_json::to_value(runner.descriptions())?;
      described.insert(runner.label(), steps);
    }
    Ok(serde_json::to_string(&Value::Object(described))?)
  }
}

impl Default for RunnerRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for RunnerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let types: Vec<String> = self
      .runners
      .lock()
      .values()
      .map(|runner| runner.label())
      .collect();
    f.debug_struct("RunnerRegistry").field("pipelines", &types).finish()
  }
}

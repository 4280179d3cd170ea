// stepline/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  /// A step failed. Carries the failing step's name and order and the original failure.
  /// Produced exactly once per failure; already-wrapped failures pass through the chain untouched.
  #[error("Exception in step '{step_name}' (order: {step_order})")]
  Execution {
    step_name: String,
    step_order: i32,
    #[source]
    source: AnyhowError,
  },

  /// A failure raised by step code that has not yet been attributed to a step.
  /// The engine converts this into `Execution` at the step boundary.
  #[error("Step failed: {source}")]
  StepFailure {
    #[source]
    source: AnyhowError,
  },

  /// The cancellation signal was observed. Never wrapped into `Execution`.
  #[error("Pipeline execution was canceled")]
  Canceled,

  #[error("Pipeline step '{type_name}' has no step descriptor; every discoverable step must declare its order and filters")]
  MissingDescriptor { type_name: String },

  #[error("Pipeline step '{type_name}' is already registered. Pipeline steps must be uniquely registered")]
  DuplicateStep { type_name: String },

  #[error("A pipeline runner for '{context_type}' is already registered")]
  RunnerAlreadyRegistered { context_type: String },

  #[error("No pipeline runner registered for '{context_type}'")]
  RunnerNotRegistered { context_type: String },

  #[error("Type mismatch for pipeline context (expected {expected_type})")]
  TypeMismatch { expected_type: String },

  #[error("Failed to serialize pipeline description: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl PipelineError {
  /// Name of the failing step, for `Execution` failures.
  pub fn step_name(&self) -> Option<&str> {
    match self {
      PipelineError::Execution { step_name, .. } => Some(step_name),
      _ => None,
    }
  }

  /// Order of the failing step, for `Execution` failures.
  pub fn step_order(&self) -> Option<i32> {
    match self {
      PipelineError::Execution { step_order, .. } => Some(*step_order),
      _ => None,
    }
  }

  pub fn is_canceled(&self) -> bool {
    matches!(self, PipelineError::Canceled)
  }

  /// True for errors raised while registering or discovering steps and runners.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      PipelineError::MissingDescriptor { .. }
        | PipelineError::DuplicateStep { .. }
        | PipelineError::RunnerAlreadyRegistered { .. }
        | PipelineError::RunnerNotRegistered { .. }
    )
  }

  /// Unwraps a `StepFailure` to the failure it carries; any other variant is boxed as-is.
  pub(crate) fn into_cause(self) -> AnyhowError {
    match self {
      PipelineError::StepFailure { source } => source,
      other => AnyhowError::new(other),
    }
  }
}

// Steps usually fail through `?` on anyhow results. A PipelineError that travelled inside an
// anyhow::Error is recovered as-is so it is not wrapped a second time.
impl From<AnyhowError> for PipelineError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<PipelineError>() {
      Ok(pipeline_err) => pipeline_err,
      Err(source) => PipelineError::StepFailure { source },
    }
  }
}

pub type PipelineResult<T, E = PipelineError> = std::result::Result<T, E>;

/// Result of a single step invocation.
pub type StepResult = PipelineResult<()>;

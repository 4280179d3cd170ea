// stepline/src/core/control.rs

//! Outcome of a pipeline execution.

/// How a successful `execute` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// Every step invoked its continuation and the terminal continuation was reached.
  Completed,
  /// A step returned without invoking its continuation; later steps never ran.
  ///
  /// Detection is behavioural: it does not consult the step's `may_short_circuit` hint.
  ShortCircuited { step_name: String, step_order: i32 },
}

impl PipelineOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, PipelineOutcome::Completed)
  }

  pub fn is_short_circuited(&self) -> bool {
    matches!(self, PipelineOutcome::ShortCircuited { .. })
  }

  /// Name of the step that short-circuited the chain, if any.
  pub fn short_circuited_by(&self) -> Option<&str> {
    match self {
      PipelineOutcome::ShortCircuited { step_name, .. } => Some(step_name),
      PipelineOutcome::Completed => None,
    }
  }
}

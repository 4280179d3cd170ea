// stepline/src/diagnostics/mod.rs

//! Telemetry sink the engine reports to at step boundaries.
//!
//! The engine opens one scope per executed step, marks it short-circuited or canceled, and
//! reports step failures. What a sink does with that is up to the implementation.

mod span;

pub use span::TracingDiagnostics;

use crate::core::step::PipelineStep;
use crate::error::PipelineError;
use tracing::Span;

/// Per-step observation window. The scope ends when it is dropped.
pub trait DiagnosticsScope: Send {
  fn set_short_circuited(&mut self, value: bool);

  fn set_canceled(&mut self);

  /// Span the engine enters for the rest of the step, so the step's own events and the
  /// failure report nest under it.
  fn span(&self) -> Span {
    Span::none()
  }
}

pub trait PipelineDiagnostics<T>: Send + Sync
where
  T: Send + Sync + 'static,
{
  fn begin_step(&self, step: &dyn PipelineStep<T>, order: i32) -> Box<dyn DiagnosticsScope>;

  /// Called once for a failure that originated in `step`, before it is wrapped.
  fn report_error(&self, error: &PipelineError, step: &dyn PipelineStep<T>, order: i32);
}

/// Sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

#[derive(Debug)]
struct NoopScope;

impl DiagnosticsScope for NoopScope {
  fn set_short_circuited(&mut self, _value: bool) {}

  fn set_canceled(&mut self) {}
}

impl<T: Send + Sync + 'static> PipelineDiagnostics<T> for NoopDiagnostics {
  fn begin_step(&self, _step: &dyn PipelineStep<T>, _order: i32) -> Box<dyn DiagnosticsScope> {
    Box::new(NoopScope)
  }

  fn report_error(&self, _error: &PipelineError, _step: &dyn PipelineStep<T>, _order: i32) {}
}

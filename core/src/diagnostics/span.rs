// stepline/src/diagnostics/span.rs

//! `tracing`-backed diagnostics: one span per step, OpenTelemetry-style field names.

use super::{DiagnosticsScope, PipelineDiagnostics};
use crate::core::step::PipelineStep;
use crate::core::type_name::short_type_name;
use crate::error::PipelineError;
use tracing::{event, field, span, Level, Span};

/// Emits a `pipeline.step` span per step under the `stepline::diagnostics` target.
///
/// Span fields: `pipeline.context_type`, `pipeline.step_name`, `pipeline.step_order`,
/// `pipeline.step_description`, and, once known, `pipeline.short_circuited` / `pipeline.canceled`.
/// The engine enters the span while the step runs. Failures are emitted inside it as an ERROR
/// event with `exception.*` and `otel.status_*` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
  pub fn new() -> Self {
    Self
  }
}

struct SpanScope {
  span: Span,
}

impl DiagnosticsScope for SpanScope {
  fn set_short_circuited(&mut self, value: bool) {
    self.span.record("pipeline.short_circuited", value);
  }

  fn set_canceled(&mut self) {
    self.span.record("pipeline.canceled", true);
  }

  fn span(&self) -> Span {
    self.span.clone()
  }
}

impl<T: Send + Sync + 'static> PipelineDiagnostics<T> for TracingDiagnostics {
  fn begin_step(&self, step: &dyn PipelineStep<T>, order: i32) -> Box<dyn DiagnosticsScope> {
    let span = span!(
      target: "stepline::diagnostics",
      Level::INFO,
      "pipeline.step",
      pipeline.context_type = %short_type_name::<T>(),
      pipeline.step_name = %step.name(),
      pipeline.step_order = order,
      pipeline.step_description = step.description().unwrap_or_default(),
      pipeline.short_circuited = field::Empty,
      pipeline.canceled = field::Empty,
    );
    Box::new(SpanScope { span })
  }

  fn report_error(&self, error: &PipelineError, step: &dyn PipelineStep<T>, order: i32) {
    let message = match error {
      PipelineError::StepFailure { source } => source.to_string(),
      other => other.to_string(),
    };
    event!(
      target: "stepline::diagnostics",
      Level::ERROR,
      pipeline.context_type = %short_type_name::<T>(),
      pipeline.step_name = %step.name(),
      pipeline.step_order = order,
      exception.message = %message,
      exception.chain = ?error,
      otel.status_code = "ERROR",
      otel.status_description = %message,
      "Pipeline step failed."
    );
  }
}

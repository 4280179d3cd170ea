// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use stepline::{
  CancellationToken, ContextData, DiagnosticsScope, Next, PipelineDiagnostics, PipelineError, PipelineStep, StepResult,
};
use tracing::Level;

// --- Common Context Struct ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub log: Vec<String>,
}

pub fn log_of(ctx: &ContextData<TestContext>) -> Vec<String> {
  ctx.read().log.clone()
}

// --- Configurable Recording Step ---
#[derive(Clone, Debug)]
pub enum Behavior {
  Continue,
  ShortCircuit,
  Fail(&'static str),
  /// Requests cancellation on the given token, then invokes `next`.
  CancelThenContinue(CancellationToken),
  /// Waits for the token to be cancelled and reports `Canceled`.
  WaitForCancel,
}

#[derive(Clone, Debug)]
pub struct RecordingStep {
  pub name: String,
  pub description: Option<String>,
  pub may_short_circuit: bool,
  pub condition: Option<String>,
  pub behavior: Behavior,
}

impl RecordingStep {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      description: None,
      may_short_circuit: false,
      condition: None,
      behavior: Behavior::Continue,
    }
  }

  pub fn behaving(mut self, behavior: Behavior) -> Self {
    self.behavior = behavior;
    self
  }

  pub fn described(mut self, description: &str) -> Self {
    self.description = Some(description.to_string());
    self
  }

  pub fn declares_short_circuit(mut self, condition: &str) -> Self {
    self.may_short_circuit = true;
    self.condition = Some(condition.to_string());
    self
  }
}

#[async_trait]
impl PipelineStep<TestContext> for RecordingStep {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  fn may_short_circuit(&self) -> bool {
    self.may_short_circuit
  }

  fn short_circuit_condition(&self) -> Option<&str> {
    self.condition.as_deref()
  }

  async fn execute(&self, ctx: ContextData<TestContext>, next: Next<TestContext>, cancel: CancellationToken) -> StepResult {
    ctx.update(|c| {
      c.counter += 1;
      c.log.push(self.name.clone());
    });
    tracing::debug!(target: "test_steps", step = %self.name, behavior = ?self.behavior, "executing");

    match &self.behavior {
      Behavior::Continue => next.run(ctx, cancel).await,
      Behavior::ShortCircuit => Ok(()),
      Behavior::Fail(message) => Err(anyhow::anyhow!(*message).into()),
      Behavior::CancelThenContinue(token) => {
        token.cancel();
        next.run(ctx, cancel).await
      }
      Behavior::WaitForCancel => {
        cancel.cancelled().await;
        Err(PipelineError::Canceled)
      }
    }
  }
}

pub fn step_factory(step: RecordingStep) -> impl Fn() -> Arc<dyn PipelineStep<TestContext>> + Send + Sync + 'static {
  move || Arc::new(step.clone()) as Arc<dyn PipelineStep<TestContext>>
}

/// Factory that counts how many times it constructs the step.
pub fn counting_factory(
  step: RecordingStep,
  constructed: Arc<AtomicUsize>,
) -> impl Fn() -> RecordingStep + Send + Sync + 'static {
  move || {
    constructed.fetch_add(1, Ordering::SeqCst);
    step.clone()
  }
}

// --- Recording Diagnostics Sink ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagEvent {
  Begin { name: String, order: i32 },
  ShortCircuited { name: String, value: bool },
  Canceled { name: String },
  Error { name: String, order: i32, message: String },
  End { name: String },
}

#[derive(Clone, Default)]
pub struct RecordingDiagnostics {
  events: Arc<Mutex<Vec<DiagEvent>>>,
}

impl RecordingDiagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<DiagEvent> {
    self.events.lock().clone()
  }

  pub fn count(&self, pred: impl Fn(&DiagEvent) -> bool) -> usize {
    self.events.lock().iter().filter(|e| pred(e)).count()
  }
}

struct RecordingScope {
  name: String,
  events: Arc<Mutex<Vec<DiagEvent>>>,
}

impl DiagnosticsScope for RecordingScope {
  fn set_short_circuited(&mut self, value: bool) {
    self.events.lock().push(DiagEvent::ShortCircuited {
      name: self.name.clone(),
      value,
    });
  }

  fn set_canceled(&mut self) {
    self.events.lock().push(DiagEvent::Canceled { name: self.name.clone() });
  }
}

impl Drop for RecordingScope {
  fn drop(&mut self) {
    self.events.lock().push(DiagEvent::End { name: self.name.clone() });
  }
}

impl<T: Send + Sync + 'static> PipelineDiagnostics<T> for RecordingDiagnostics {
  fn begin_step(&self, step: &dyn PipelineStep<T>, order: i32) -> Box<dyn DiagnosticsScope> {
    self.events.lock().push(DiagEvent::Begin {
      name: step.name().to_string(),
      order,
    });
    Box::new(RecordingScope {
      name: step.name().to_string(),
      events: self.events.clone(),
    })
  }

  fn report_error(&self, error: &PipelineError, step: &dyn PipelineStep<T>, order: i32) {
    let message = match error {
      PipelineError::StepFailure { source } => source.to_string(),
      other => other.to_string(),
    };
    self.events.lock().push(DiagEvent::Error {
      name: step.name().to_string(),
      order,
      message,
    });
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Capturing tracing events for assertions ---
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Clone, Debug)]
pub struct CapturedEvent {
  pub level: Level,
  pub message: String,
  /// Names of the enclosing spans, outermost first.
  pub spans: Vec<String>,
}

/// Layer that keeps every event it sees. Install per test with `tracing::subscriber::set_default`.
#[derive(Clone, Default)]
pub struct EventCapture {
  events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(self.clone())
  }

  pub fn events(&self) -> Vec<CapturedEvent> {
    self.events.lock().clone()
  }

  pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
    self.events().into_iter().filter(|e| e.level == level).collect()
  }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
  fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
    if field.name() == "message" {
      self.0 = format!("{:?}", value);
    }
  }
}

impl<S> Layer<S> for EventCapture
where
  S: Subscriber + for<'a> LookupSpan<'a>,
{
  fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);
    let spans = ctx
      .event_scope(event)
      .map(|scope| scope.from_root().map(|span| span.name().to_string()).collect())
      .unwrap_or_default();
    self.events.lock().push(CapturedEvent {
      level: *event.metadata().level(),
      message: visitor.0,
      spans,
    });
  }
}

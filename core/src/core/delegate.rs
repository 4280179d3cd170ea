// stepline/src/core/delegate.rs

//! A pipeline step backed by a closure.

use crate::core::context_data::ContextData;
use crate::core::next::{Next, StepFuture};
use crate::core::step::PipelineStep;
use crate::error::StepResult;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

type DelegateFn<T> = Box<dyn Fn(ContextData<T>, Next<T>, CancellationToken) -> StepFuture + Send + Sync>;

/// A step whose behaviour is a closure, for steps too small to deserve their own type.
///
/// ```ignore
/// let step = DelegateStep::new("audit", |ctx: ContextData<Order>, next, cancel| async move {
///   ctx.update(|o| o.audited = true);
///   next.run(ctx, cancel).await
/// })
/// .with_description("Marks the order as audited");
/// ```
pub struct DelegateStep<T: Send + Sync + 'static> {
  name: String,
  description: Option<String>,
  may_short_circuit: bool,
  short_circuit_condition: Option<String>,
  invoke: DelegateFn<T>,
}

impl<T: Send + Sync + 'static> DelegateStep<T> {
  pub fn new<F, Fut>(name: impl Into<String>, invoke: F) -> Self
  where
    F: Fn(ContextData<T>, Next<T>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StepResult> + Send + 'static,
  {
    Self {
      name: name.into(),
      description: None,
      may_short_circuit: false,
      short_circuit_condition: None,
      invoke: Box::new(
        move |ctx: ContextData<T>, next: Next<T>, cancel: CancellationToken| -> StepFuture {
          Box::pin(invoke(ctx, next, cancel))
        },
      ),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  /// Marks the step as possibly short-circuiting and records why.
  pub fn short_circuits_when(mut self, condition: impl Into<String>) -> Self {
    self.may_short_circuit = true;
    self.short_circuit_condition = Some(condition.into());
    self
  }
}

#[async_trait]
impl<T: Send + Sync + 'static> PipelineStep<T> for DelegateStep<T> {
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
    self.short_circuit_condition.as_deref()
  }

  async fn execute(&self, ctx: ContextData<T>, next: Next<T>, cancel: CancellationToken) -> StepResult {
    (self.invoke)(ctx, next, cancel).await
  }
}

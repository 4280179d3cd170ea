// stepline/src/pipeline/lazy.rs

//! Deferred, memoized construction of step instances.

use crate::core::step::PipelineStep;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{event, Level};

/// Constructs a step instance on demand.
pub type StepFactory<T> = Arc<dyn Fn() -> Arc<dyn PipelineStep<T>> + Send + Sync>;

/// A step handle that constructs its step on first access.
///
/// Construction happens at most once per handle; clones share the same cell, and concurrent
/// first accesses resolve to a single instance.
pub struct LazyStep<T: Send + Sync + 'static> {
  order: i32,
  factory: StepFactory<T>,
  instance: Arc<OnceCell<Arc<dyn PipelineStep<T>>>>,
}

impl<T: Send + Sync + 'static> LazyStep<T> {
  pub fn new<S, F>(order: i32, factory: F) -> Self
  where
    S: PipelineStep<T> + 'static,
    F: Fn() -> S + Send + Sync + 'static,
  {
    Self::from_factory(order, Arc::new(move || Arc::new(factory()) as Arc<dyn PipelineStep<T>>))
  }

  pub fn from_factory(order: i32, factory: StepFactory<T>) -> Self {
    Self {
      order,
      factory,
      instance: Arc::new(OnceCell::new()),
    }
  }

  /// Wraps an already constructed step.
  pub fn from_instance(order: i32, step: Arc<dyn PipelineStep<T>>) -> Self {
    let cell = OnceCell::new();
    let _ = cell.set(step.clone());
    Self {
      order,
      factory: Arc::new(move || step.clone()),
      instance: Arc::new(cell),
    }
  }

  pub fn order(&self) -> i32 {
    self.order
  }

  /// Returns the step, constructing it on first access.
  pub fn get(&self) -> Arc<dyn PipelineStep<T>> {
    self
      .instance
      .get_or_init(|| {
        let step = (self.factory)();
        event!(Level::TRACE, step_name = %step.name(), step_order = self.order, "Constructed pipeline step.");
        step
      })
      .clone()
  }

  pub fn is_constructed(&self) -> bool {
    self.instance.get().is_some()
  }

  /// A handle with the same factory and order but its own, not yet constructed, instance.
  pub fn detached(&self) -> Self {
    Self::from_factory(self.order, self.factory.clone())
  }
}

impl<T: Send + Sync + 'static> Clone for LazyStep<T> {
  fn clone(&self) -> Self {
    Self {
      order: self.order,
      factory: self.factory.clone(),
      instance: self.instance.clone(),
    }
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for LazyStep<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LazyStep")
      .field("order", &self.order)
      .field("constructed", &self.is_constructed())
      .finish()
  }
}

// stepline/src/pipeline/resolver.rs

//! The boundary between discovery and execution: ordered lazy step handles on demand.

use crate::discovery::scan::DiscoveredStep;
use crate::pipeline::lazy::LazyStep;
use serde::Deserialize;
use std::marker::PhantomData;

/// Supplies the ordered lazy step handles a runner of pipeline `P` executes.
///
/// `P` is the pipeline marker; `()` is the default pipeline of context type `T`.
pub trait StepResolver<T, P = ()>: Send + Sync
where
  T: Send + Sync + 'static,
  P: 'static,
{
  /// Handles in discovery order.
  fn resolve(&self) -> Vec<LazyStep<T>>;
}

impl<T: Send + Sync + 'static> StepResolver<T> for Vec<LazyStep<T>> {
  fn resolve(&self) -> Vec<LazyStep<T>> {
    self.clone()
  }
}

/// How step instances are shared between runners resolved from one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepLifetime {
  /// Each `resolve` hands out fresh handles, so each runner constructs its own steps.
  #[default]
  Transient,
  /// All runners share one instance per step.
  Singleton,
}

/// Holds the discovered steps of pipeline `P` over context type `T`.
pub struct StepRegistry<T: Send + Sync + 'static, P: 'static = ()> {
  steps: Vec<DiscoveredStep<T>>,
  shared: Vec<LazyStep<T>>,
  lifetime: StepLifetime,
  _pipeline: PhantomData<fn() -> P>,
}

impl<T: Send + Sync + 'static, P: 'static> StepRegistry<T, P> {
  pub fn new(steps: Vec<DiscoveredStep<T>>, lifetime: StepLifetime) -> Self {
    let shared = steps.iter().map(DiscoveredStep::to_lazy).collect();
    Self {
      steps,
      shared,
      lifetime,
      _pipeline: PhantomData,
    }
  }

  pub fn steps(&self) -> &[DiscoveredStep<T>] {
    &self.steps
  }

  pub fn lifetime(&self) -> StepLifetime {
    self.lifetime
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

impl<T: Send + Sync + 'static, P: 'static> StepResolver<T, P> for StepRegistry<T, P> {
  fn resolve(&self) -> Vec<LazyStep<T>> {
    match self.lifetime {
      StepLifetime::Singleton => self.shared.clone(),
      StepLifetime::Transient => self.shared.iter().map(LazyStep::detached).collect(),
    }
  }
}

// stepline/src/discovery/source.rs

//! Step candidates and the sources that enumerate them.

use crate::core::delegate::DelegateStep;
use crate::core::step::PipelineStep;
use crate::discovery::descriptor::{StepDefinition, StepDescriptor};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::lazy::StepFactory;
use anyhow::Context as AnyhowContext;
use std::any::TypeId;
use std::sync::Arc;
use tracing::{event, Level};

/// A step implementation offered to discovery: its identity, its (possibly missing)
/// descriptor, and a factory for deferred construction.
pub struct StepCandidate<T: Send + Sync + 'static> {
  type_name: String,
  type_id: Option<TypeId>,
  descriptor: Option<StepDescriptor>,
  factory: StepFactory<T>,
}

impl<T: Send + Sync + 'static> StepCandidate<T> {
  /// Candidate for a step type, with the descriptor it declares through `StepDefinition`.
  pub fn of<S>(factory: impl Fn() -> S + Send + Sync + 'static) -> Self
  where
    S: StepDefinition<T>,
  {
    Self {
      type_name: std::any::type_name::<S>().to_string(),
      type_id: Some(TypeId::of::<S>()),
      descriptor: S::descriptor(),
      factory: Arc::new(move || Arc::new(factory()) as Arc<dyn PipelineStep<T>>),
    }
  }

  pub fn of_default<S>() -> Self
  where
    S: StepDefinition<T> + Default,
  {
    Self::of(S::default)
  }

  /// Candidate described from outside the type system, e.g. a plugin manifest.
  /// Such candidates are not checked for duplicate registration.
  pub fn new<S>(
    type_name: impl Into<String>,
    descriptor: Option<StepDescriptor>,
    factory: impl Fn() -> S + Send + Sync + 'static,
  ) -> Self
  where
    S: PipelineStep<T> + 'static,
  {
    Self {
      type_name: type_name.into(),
      type_id: None,
      descriptor,
      factory: Arc::new(move || Arc::new(factory()) as Arc<dyn PipelineStep<T>>),
    }
  }

  /// Candidate for a closure-backed step. The single step instance is shared by every
  /// handle created from this candidate.
  pub fn delegate(descriptor: StepDescriptor, step: DelegateStep<T>) -> Self {
    let type_name = step.name().to_string();
    let step: Arc<dyn PipelineStep<T>> = Arc::new(step);
    Self {
      type_name,
      type_id: None,
      descriptor: Some(descriptor),
      factory: Arc::new(move || step.clone()),
    }
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn type_id(&self) -> Option<TypeId> {
    self.type_id
  }

  pub fn descriptor(&self) -> Option<&StepDescriptor> {
    self.descriptor.as_ref()
  }

  pub(crate) fn into_parts(self) -> (String, Option<TypeId>, Option<StepDescriptor>, StepFactory<T>) {
    (self.type_name, self.type_id, self.descriptor, self.factory)
  }
}

impl<T: Send + Sync + 'static> Clone for StepCandidate<T> {
  fn clone(&self) -> Self {
    Self {
      type_name: self.type_name.clone(),
      type_id: self.type_id,
      descriptor: self.descriptor.clone(),
      factory: self.factory.clone(),
    }
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepCandidate<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepCandidate")
      .field("type_name", &self.type_name)
      .field("descriptor", &self.descriptor)
      .finish()
  }
}

/// Anything that can enumerate step candidates for a context type.
///
/// An `Err` entry stands for a candidate that could not be loaded. Discovery logs and skips
/// it; one bad entry never aborts the scan.
pub trait StepSource<T>: Send + Sync
where
  T: Send + Sync + 'static,
{
  fn candidates(&self) -> Vec<anyhow::Result<StepCandidate<T>>>;
}

type Loader<T> = Box<dyn Fn() -> anyhow::Result<StepCandidate<T>> + Send + Sync>;

enum CatalogEntry<T: Send + Sync + 'static> {
  Ready(StepCandidate<T>),
  Deferred { label: String, loader: Loader<T> },
}

/// In-process step source populated through explicit registration calls.
pub struct StepCatalog<T: Send + Sync + 'static> {
  entries: Vec<CatalogEntry<T>>,
}

impl<T: Send + Sync + 'static> StepCatalog<T> {
  pub fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Registers a default-constructible step type.
  pub fn register<S>(&mut self) -> PipelineResult<&mut Self>
  where
    S: StepDefinition<T> + Default,
  {
    self.register_candidate(StepCandidate::of_default::<S>())
  }

  /// Registers a step type built by `factory`.
  pub fn register_with<S>(&mut self, factory: impl Fn() -> S + Send + Sync + 'static) -> PipelineResult<&mut Self>
  where
    S: StepDefinition<T>,
  {
    self.register_candidate(StepCandidate::of(factory))
  }

  /// Registers a prepared candidate. Fails if a candidate for the same step type is already present.
  pub fn register_candidate(&mut self, candidate: StepCandidate<T>) -> PipelineResult<&mut Self> {
    if let Some(type_id) = candidate.type_id() {
      let duplicate = self.entries.iter().any(|entry| match entry {
        CatalogEntry::Ready(existing) => existing.type_id() == Some(type_id),
        CatalogEntry::Deferred { .. } => false,
      });
      if duplicate {
        event!(Level::WARN, step = %candidate.type_name(), "Attempt to register pipeline step multiple times.");
        return Err(PipelineError::DuplicateStep {
          type_name: candidate.type_name().to_string(),
        });
      }
    }
    event!(Level::DEBUG, step = %candidate.type_name(), "Registering pipeline step.");
    self.entries.push(CatalogEntry::Ready(candidate));
    Ok(self)
  }

  pub fn register_delegate(&mut self, descriptor: StepDescriptor, step: DelegateStep<T>) -> &mut Self {
    event!(Level::DEBUG, step = %step.name(), "Registering delegate pipeline step.");
    self.entries.push(CatalogEntry::Ready(StepCandidate::delegate(descriptor, step)));
    self
  }

  /// Registers an entry resolved only when the catalog is enumerated. A failing loader is
  /// skipped by discovery.
  pub fn register_loader(
    &mut self,
    label: impl Into<String>,
    loader: impl Fn() -> anyhow::Result<StepCandidate<T>> + Send + Sync + 'static,
  ) -> &mut Self {
    self.entries.push(CatalogEntry::Deferred {
      label: label.into(),
      loader: Box::new(loader),
    });
    self
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<T: Send + Sync + 'static> Default for StepCatalog<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepCatalog<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let entries: Vec<&str> = self
      .entries
      .iter()
      .map(|entry| match entry {
        CatalogEntry::Ready(candidate) => candidate.type_name(),
        CatalogEntry::Deferred { label, .. } => label.as_str(),
      })
      .collect();
    f.debug_struct("StepCatalog").field("entries", &entries).finish()
  }
}

impl<T: Send + Sync + 'static> StepSource<T> for StepCatalog<T> {
  fn candidates(&self) -> Vec<anyhow::Result<StepCandidate<T>>> {
    self
      .entries
      .iter()
      .map(|entry| match entry {
        CatalogEntry::Ready(candidate) => Ok(candidate.clone()),
        CatalogEntry::Deferred { label, loader } => {
          loader().with_context(|| format!("failed to load step candidate '{}'", label))
        }
      })
      .collect()
  }
}

impl<T: Send + Sync + 'static> StepSource<T> for Vec<StepCandidate<T>> {
  fn candidates(&self) -> Vec<anyhow::Result<StepCandidate<T>>> {
    self.iter().cloned().map(Ok).collect()
  }
}

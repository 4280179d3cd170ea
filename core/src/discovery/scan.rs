// stepline/src/discovery/scan.rs

//! Turns candidate steps from one or more sources into the ordered, filtered step list.

use crate::core::type_name::short_type_name;
use crate::discovery::descriptor::StepDescriptor;
use crate::discovery::source::StepSource;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::lazy::{LazyStep, StepFactory};
use std::any::TypeId;
use std::collections::HashSet;
use tracing::{event, instrument, Level};

/// A step that passed discovery: validated descriptor plus its deferred factory.
pub struct DiscoveredStep<T: Send + Sync + 'static> {
  type_name: String,
  descriptor: StepDescriptor,
  factory: StepFactory<T>,
}

impl<T: Send + Sync + 'static> DiscoveredStep<T> {
  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn descriptor(&self) -> &StepDescriptor {
    &self.descriptor
  }

  /// A fresh lazy handle for this step, ordered by its descriptor.
  pub fn to_lazy(&self) -> LazyStep<T> {
    LazyStep::from_factory(self.descriptor.order(), self.factory.clone())
  }
}

impl<T: Send + Sync + 'static> Clone for DiscoveredStep<T> {
  fn clone(&self) -> Self {
    Self {
      type_name: self.type_name.clone(),
      descriptor: self.descriptor.clone(),
      factory: self.factory.clone(),
    }
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for DiscoveredStep<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DiscoveredStep")
      .field("type_name", &self.type_name)
      .field("descriptor", &self.descriptor)
      .finish()
  }
}

/// Enumerates every source in turn and returns the active steps, sorted ascending by order.
/// Equal orders keep the order in which the steps were enumerated.
///
/// Fails with `MissingDescriptor` for a candidate without a descriptor and with
/// `DuplicateStep` when the same step type is offered twice. Candidates that fail to load
/// are logged and skipped.
#[instrument(
  name = "stepline::discover",
  skip_all,
  fields(
    context_type = %short_type_name::<T>(),
    num_sources = sources.len(),
  ),
  err(Display)
)]
pub fn discover<T, S>(sources: &[&dyn StepSource<T>], active_filters: &[S]) -> PipelineResult<Vec<DiscoveredStep<T>>>
where
  T: Send + Sync + 'static,
  S: AsRef<str>,
{
  let mut seen_types: HashSet<TypeId> = HashSet::new();
  let mut active = Vec::new();

  for (source_index, source) in sources.iter().enumerate() {
    for entry in source.candidates() {
      let candidate = match entry {
        Ok(candidate) => candidate,
        Err(err) => {
          event!(Level::WARN, source_index, error = %format!("{:#}", err), "Skipping step candidate that could not be loaded.");
          continue;
        }
      };

      let (type_name, type_id, descriptor, factory) = candidate.into_parts();

      let descriptor = match descriptor {
        Some(descriptor) => descriptor,
        None => {
          event!(Level::ERROR, step = %type_name, "Pipeline step has no descriptor.");
          return Err(PipelineError::MissingDescriptor { type_name });
        }
      };

      if let Some(type_id) = type_id {
        if !seen_types.insert(type_id) {
          event!(Level::ERROR, step = %type_name, "Pipeline step offered more than once.");
          return Err(PipelineError::DuplicateStep { type_name });
        }
      }

      if !descriptor.matches(active_filters) {
        event!(Level::DEBUG, step = %type_name, filters = %descriptor.filters().join(","), "Pipeline step excluded by filters.");
        continue;
      }

      active.push(DiscoveredStep {
        type_name,
        descriptor,
        factory,
      });
    }
  }

  // sort_by_key is stable: equal orders keep enumeration order.
  active.sort_by_key(|step| step.descriptor.order());

  for step in &active {
    event!(
      Level::DEBUG,
      step = %step.type_name,
      order = step.descriptor.order(),
      filters = %step.descriptor.filters().join(","),
      "Discovered pipeline step."
    );
  }

  if active.is_empty() {
    event!(Level::WARN, "No pipeline steps found.");
  } else {
    event!(Level::INFO, count = active.len(), "Discovered pipeline steps.");
  }

  Ok(active)
}

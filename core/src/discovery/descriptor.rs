// stepline/src/discovery/descriptor.rs

//! Static ordering and activation metadata for step types.

use crate::core::step::PipelineStep;

/// Ordering and activation metadata for one step type.
///
/// `order` is the primary sort key (ascending; ties keep discovery order). `filters` are
/// activation tags; an empty set means the step is always active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
  order: i32,
  filters: Vec<String>,
}

impl StepDescriptor {
  pub fn new(order: i32) -> Self {
    Self {
      order,
      filters: Vec::new(),
    }
  }

  /// Adds an activation tag. Tags are compared case-insensitively; duplicates are ignored.
  pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
    let filter = filter.into();
    if !self.filters.iter().any(|existing| eq_ignore_case(existing, &filter)) {
      self.filters.push(filter);
    }
    self
  }

  pub fn with_filters<I, S>(self, filters: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    filters.into_iter().fold(self, |descriptor, f| descriptor.with_filter(f))
  }

  pub fn order(&self) -> i32 {
    self.order
  }

  pub fn filters(&self) -> &[String] {
    &self.filters
  }

  /// Whether a step with this descriptor is active for the given active filters.
  ///
  /// - No descriptor filters: always active.
  /// - Descriptor filters but no active filters: inactive. Filtered steps are opt-in.
  /// - Otherwise active iff some descriptor filter equals some active filter, ignoring case.
  pub fn matches<S: AsRef<str>>(&self, active_filters: &[S]) -> bool {
    if self.filters.is_empty() {
      return true;
    }
    self
      .filters
      .iter()
      .any(|own| active_filters.iter().any(|active| eq_ignore_case(own, active.as_ref())))
  }
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
  a.chars()
    .flat_map(char::to_lowercase)
    .eq(b.chars().flat_map(char::to_lowercase))
}

/// A step type that can be discovered and ordered.
///
/// Implementors must override [`StepDefinition::descriptor`]. The default returns `None`, and
/// discovery rejects such types with `PipelineError::MissingDescriptor` instead of skipping them.
///
/// ```ignore
/// impl StepDefinition<Order> for ChargeCard {
///   fn descriptor() -> Option<StepDescriptor> {
///     Some(StepDescriptor::new(20).with_filter("production"))
///   }
/// }
/// ```
pub trait StepDefinition<T>: PipelineStep<T> + Sized + 'static
where
  T: Send + Sync + 'static,
{
  fn descriptor() -> Option<StepDescriptor> {
    None
  }
}

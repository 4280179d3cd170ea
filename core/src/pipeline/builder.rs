// stepline/src/pipeline/builder.rs

//! Fluent construction of a `PipelineRunner<T>` from registered steps and sources.

use crate::config::{DiagnosticsMode, PipelineConfig};
use crate::core::delegate::DelegateStep;
use crate::diagnostics::{NoopDiagnostics, PipelineDiagnostics, TracingDiagnostics};
use crate::discovery::descriptor::{StepDefinition, StepDescriptor};
use crate::discovery::scan::discover;
use crate::discovery::source::{StepCatalog, StepSource};
use crate::error::PipelineResult;
use crate::pipeline::resolver::{StepLifetime, StepRegistry};
use crate::pipeline::runner::PipelineRunner;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collects steps, sources and settings, then discovers and composes the pipeline.
///
/// Steps registered on the builder itself are enumerated before any added source.
/// `P` names the pipeline being built; see [`PipelineRunner`].
///
/// ```ignore
/// let runner = PipelineBuilder::<Order>::new()
///   .with_step::<Validate>()?
///   .with_step::<ChargeCard>()?
///   .with_filter("production")
///   .build()?;
///
/// // A second, independent pipeline over the same context type.
/// let refunds = PipelineBuilder::<Order, Refunds>::new()
///   .with_step::<ReverseCharge>()?
///   .build()?;
/// ```
pub struct PipelineBuilder<T: Send + Sync + 'static, P: 'static = ()> {
  catalog: StepCatalog<T>,
  sources: Vec<Box<dyn StepSource<T>>>,
  filters: Vec<String>,
  lifetime: StepLifetime,
  diagnostics: Arc<dyn PipelineDiagnostics<T>>,
  _pipeline: PhantomData<fn() -> P>,
}

impl<T: Send + Sync + 'static, P: 'static> PipelineBuilder<T, P> {
  pub fn new() -> Self {
    Self {
      catalog: StepCatalog::new(),
      sources: Vec::new(),
      filters: Vec::new(),
      lifetime: StepLifetime::default(),
      diagnostics: Arc::new(NoopDiagnostics),
      _pipeline: PhantomData,
    }
  }

  pub fn with_step<S>(mut self) -> PipelineResult<Self>
  where
    S: StepDefinition<T> + Default,
  {
    self.catalog.register::<S>()?;
    Ok(self)
  }

  pub fn with_step_factory<S>(mut self, factory: impl Fn() -> S + Send + Sync + 'static) -> PipelineResult<Self>
  where
    S: StepDefinition<T>,
  {
    self.catalog.register_with::<S>(factory)?;
    Ok(self)
  }

  pub fn with_delegate(mut self, descriptor: StepDescriptor, step: DelegateStep<T>) -> Self {
    self.catalog.register_delegate(descriptor, step);
    self
  }

  pub fn with_source(mut self, source: impl StepSource<T> + 'static) -> Self {
    self.sources.push(Box::new(source));
    self
  }

  pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
    self.filters.push(filter.into());
    self
  }

  pub fn with_filters<I, S>(mut self, filters: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.filters.extend(filters.into_iter().map(Into::into));
    self
  }

  pub fn with_lifetime(mut self, lifetime: StepLifetime) -> Self {
    self.lifetime = lifetime;
    self
  }

  pub fn with_diagnostics(mut self, diagnostics: impl PipelineDiagnostics<T> + 'static) -> Self {
    self.diagnostics = Arc::new(diagnostics);
    self
  }

  /// Applies filters, lifetime and diagnostics mode from `config`. Filters are added to
  /// any already set.
  pub fn with_config(self, config: &PipelineConfig) -> Self {
    let builder = self
      .with_filters(config.filters.iter().cloned())
      .with_lifetime(config.lifetime);
    match config.diagnostics {
      DiagnosticsMode::None => builder.with_diagnostics(NoopDiagnostics),
      DiagnosticsMode::Tracing => builder.with_diagnostics(TracingDiagnostics::new()),
    }
  }

  /// Runs discovery and returns the registry without composing a runner.
  pub fn build_registry(&self) -> PipelineResult<StepRegistry<T, P>> {
    let mut sources: Vec<&dyn StepSource<T>> = Vec::with_capacity(self.sources.len() + 1);
    sources.push(&self.catalog);
    sources.extend(self.sources.iter().map(|source| &**source));

    let discovered = discover(sources.as_slice(), self.filters.as_slice())?;
    Ok(StepRegistry::new(discovered, self.lifetime))
  }

  pub fn build(self) -> PipelineResult<PipelineRunner<T, P>> {
    let registry = self.build_registry()?;
    Ok(PipelineRunner::from_resolver(&registry, self.diagnostics))
  }
}

impl<T: Send + Sync + 'static, P: 'static> Default for PipelineBuilder<T, P> {
  fn default() -> Self {
    Self::new()
  }
}

// stepline/src/lib.rs

//! Stepline: a composable, asynchronous step-pipeline runtime.
//!
//! A pipeline is an ordered list of steps operating on one shared context type. Each step
//! receives the context, a continuation for the rest of the chain, and a cancellation signal,
//! and decides whether to continue. Features:
//!  - Discovery of steps from one or more sources, ordered by descriptor and filtered by tag.
//!  - Lazy step construction, at most once per step handle.
//!  - Short-circuiting by simply not invoking the continuation.
//!  - Failures reported once, wrapped with the failing step's name and order.
//!  - Cooperative cancellation observed at every step boundary.
//!  - Per-step diagnostics scopes and `tracing` spans.
//!  - JSON descriptions of composed pipelines and their schema.
//!  - A type-keyed registry for hosting runners for several context types, with any number
//!    of independent pipelines per context type.

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::{ContextData, DelegateStep, Next, PipelineOutcome, PipelineStep, StepFuture};

pub use crate::discovery::{discover, DiscoveredStep, StepCandidate, StepCatalog, StepDefinition, StepDescriptor, StepSource};

pub use crate::pipeline::{
  step_schema, step_schema_json, LazyStep, PipelineBuilder, PipelineRunner, StepDescription, StepFactory,
  StepLifetime, StepRegistry, StepResolver,
};

pub use crate::diagnostics::{DiagnosticsScope, NoopDiagnostics, PipelineDiagnostics, TracingDiagnostics};

pub use crate::config::{DiagnosticsMode, PipelineConfig};

pub use crate::error::{PipelineError, PipelineResult, StepResult};

pub use crate::registry::RunnerRegistry;

// Steps and callers need the same token type the engine checks.
pub use tokio_util::sync::CancellationToken;

/*
    Typical use:
    1. Define a context struct `Order` and steps implementing `PipelineStep<Order>` plus
       `StepDefinition<Order>` (to declare order and filters).
    2. Build a runner: `PipelineBuilder::<Order>::new().with_step::<Validate>()?...build()?`,
       optionally with `.with_config(&PipelineConfig::from_env())`.
    3. Execute: `runner.execute(ContextData::new(order), &CancellationToken::new()).await`.
    4. Inspect the result: `PipelineOutcome::Completed`, `ShortCircuited { .. }`, or a
       `PipelineError::Execution` naming the failing step.
*/

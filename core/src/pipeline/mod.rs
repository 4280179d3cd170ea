// stepline/src/pipeline/mod.rs

//! Lazy step handles, the step registry, chain composition, execution and introspection.

pub mod builder;
pub(crate) mod chain;
pub mod describe;
pub mod lazy;
pub mod resolver;
pub mod runner;

pub use builder::PipelineBuilder;
pub use describe::{step_schema, step_schema_json, StepDescription};
pub use lazy::{LazyStep, StepFactory};
pub use resolver::{StepLifetime, StepRegistry, StepResolver};
pub use runner::PipelineRunner;

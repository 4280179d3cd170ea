// stepline/src/core/mod.rs

pub mod context_data;
pub mod control;
pub mod delegate;
pub mod next;
pub mod step;
pub(crate) mod type_name;

pub use context_data::ContextData;
pub use control::PipelineOutcome;
pub use delegate::DelegateStep;
pub use next::{Next, StepFuture};
pub use step::PipelineStep;

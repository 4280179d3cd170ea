// stepline/src/discovery/mod.rs

//! Step descriptors, candidate sources, and the discovery pass that orders and filters them.

pub mod descriptor;
pub mod scan;
pub mod source;

pub use descriptor::{StepDefinition, StepDescriptor};
pub use scan::{discover, DiscoveredStep};
pub use source::{StepCandidate, StepCatalog, StepSource};

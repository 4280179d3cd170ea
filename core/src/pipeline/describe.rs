// stepline/src/pipeline/describe.rs

//! Read-only description of a composed pipeline, as typed values or JSON.

use crate::error::PipelineError;
use crate::pipeline::runner::PipelineRunner;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};

/// One entry of [`PipelineRunner::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StepDescription {
  /// Position in execution order, starting at 0.
  pub order: usize,
  pub name: String,
  pub description: Option<String>,
  pub may_short_circuit: bool,
  pub short_circuit_condition: Option<String>,
}

static STEP_SCHEMA: Lazy<Value> = Lazy::new(|| {
  json!({
    "$schema": "http://json-schema.org/draft-07/schema#",
    "title": "PipelineStep",
    "type": "object",
    "properties": {
      "Order": { "type": "integer", "description": "Execution order of the step (inferred)" },
      "Name": { "type": "string", "description": "Display name of the step" },
      "Description": { "type": "string", "description": "Optional description of the step" },
      "MayShortCircuit": { "type": "boolean", "description": "Whether the step may halt pipeline execution early" },
      "ShortCircuitCondition": { "type": "string", "description": "Explanation of the short-circuit condition, if any" }
    },
    "required": ["Order", "Name", "MayShortCircuit"]
  })
});

static STEP_SCHEMA_JSON: Lazy<String> = Lazy::new(|| STEP_SCHEMA.to_string());

impl<T: Send + Sync + 'static, P: 'static> PipelineRunner<T, P> {
  /// Describes every step in execution order. Constructs any step not yet constructed.
  pub fn descriptions(&self) -> Vec<StepDescription> {
    self
      .steps
      .iter()
      .enumerate()
      .map(|(position, handle)| {
        let step = handle.get();
        StepDescription {
          order: position,
          name: step.name().to_string(),
          description: step.description().map(str::to_string),
          may_short_circuit: step.may_short_circuit(),
          short_circuit_condition: step.short_circuit_condition().map(str::to_string),
        }
      })
      .collect()
  }

  /// JSON array of [`StepDescription`]s, in execution order.
  pub fn describe(&self) -> Result<String, PipelineError> {
    Ok(serde_json::to_string(&self.descriptions())?)
  }

  /// JSON schema for the entries produced by [`PipelineRunner::describe`].
  /// Independent of any pipeline instance.
  pub fn describe_schema() -> &'static str {
    step_schema_json()
  }
}

/// The step description schema as a JSON value.
pub fn step_schema() -> &'static Value {
  &STEP_SCHEMA
}

pub fn step_schema_json() -> &'static str {
  STEP_SCHEMA_JSON.as_str()
}

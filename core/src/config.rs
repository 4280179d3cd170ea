// stepline/src/config.rs

//! Pipeline settings that usually come from the deployment environment rather than code.

use crate::pipeline::resolver::StepLifetime;
use serde::Deserialize;
use std::env;
use tracing::{event, Level};

pub const ENV_FILTERS: &str = "STEPLINE_FILTERS";
pub const ENV_STEP_LIFETIME: &str = "STEPLINE_STEP_LIFETIME";
pub const ENV_DIAGNOSTICS: &str = "STEPLINE_DIAGNOSTICS";

/// Which diagnostics sink a configured pipeline reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
  #[default]
  None,
  Tracing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Active filter tags, e.g. `["production"]`.
  pub filters: Vec<String>,
  pub lifetime: StepLifetime,
  pub diagnostics: DiagnosticsMode,
}

impl PipelineConfig {
  /// Reads `STEPLINE_FILTERS` (comma-separated), `STEPLINE_STEP_LIFETIME`
  /// (`transient`/`singleton`) and `STEPLINE_DIAGNOSTICS` (`none`/`tracing`).
  /// Unset or unrecognised values fall back to the defaults.
  pub fn from_env() -> Self {
    let filters = env::var(ENV_FILTERS).map(|raw| parse_filters(&raw)).unwrap_or_default();

    let lifetime = match env::var(ENV_STEP_LIFETIME).ok().as_deref().map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("singleton") => StepLifetime::Singleton,
      Some(v) if v.eq_ignore_ascii_case("transient") || v.is_empty() => StepLifetime::Transient,
      Some(other) => {
        event!(Level::WARN, value = %other, "Unrecognised {}; using transient.", ENV_STEP_LIFETIME);
        StepLifetime::Transient
      }
      None => StepLifetime::Transient,
    };

    let diagnostics = match env::var(ENV_DIAGNOSTICS).ok().as_deref().map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("tracing") => DiagnosticsMode::Tracing,
      Some(v) if v.eq_ignore_ascii_case("none") || v.is_empty() => DiagnosticsMode::None,
      Some(other) => {
        event!(Level::WARN, value = %other, "Unrecognised {}; diagnostics disabled.", ENV_DIAGNOSTICS);
        DiagnosticsMode::None
      }
      None => DiagnosticsMode::None,
    };

    Self {
      filters,
      lifetime,
      diagnostics,
    }
  }
}

fn parse_filters(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|f| !f.is_empty())
    .map(str::to_string)
    .collect()
}

//! Service configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! converter section (worker pool sizing and reference-rewrite rules). Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub converter: ConverterConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.converter.worker_count == 0 {
            warnings.push("converter.worker_count is 0; no conversions will run".into());
        }
        if self.converter.queue_capacity == 0 {
            warnings.push("converter.queue_capacity is 0; every dispatch will block".into());
        }
        if self.converter.rules.is_empty() {
            warnings.push("converter.rules is empty; all dispatches will fail to map".into());
        }

        for (i, rule) in self.converter.rules.iter().enumerate() {
            if rule.tag_suffix.is_empty() {
                warnings.push(format!(
                    "converter.rules[{i}].tag_suffix is empty; matching references map to themselves"
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Converter section
// ---------------------------------------------------------------------------

/// Worker pool sizing and rewrite rules for the conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum number of conversions in flight at once.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Number of queued jobs accepted before dispatch blocks (backpressure).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Reference-rewrite rules, evaluated in order; first match wins.
    pub rules: Vec<ConversionRule>,
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            rules: Vec::new(),
        }
    }
}

/// One reference-rewrite rule.
///
/// A rule applies to any source reference that starts with `source_prefix`
/// (an empty prefix matches everything) and produces the target reference by
/// appending `tag_suffix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRule {
    /// Display name, used in logs only.
    pub name: String,
    /// Source reference prefix this rule applies to; empty matches all.
    #[serde(default)]
    pub source_prefix: String,
    /// Suffix appended to the source reference to form the target.
    pub tag_suffix: String,
}

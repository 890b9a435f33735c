//! Machine configuration.

use serde::{Deserialize, Serialize};

/// Default separator between state keys in ids and paths.
pub const DEFAULT_DELIMITER: &str = ".";

/// Default bound on microsteps per macrostep.
pub const DEFAULT_MAX_MICROSTEPS: usize = 1000;

/// Machine configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use harel::MachineConfig;
///
/// let config = MachineConfig::from_json_str(r#"{ "max_microsteps": 16 }"#).unwrap();
/// assert_eq!(config.max_microsteps, 16);
/// assert_eq!(config.delimiter, ".");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Separator between state keys in generated ids and string paths.
    pub delimiter: String,
    /// Upper bound on microsteps in one macrostep before it is abandoned.
    pub max_microsteps: usize,
    /// The machine's own version, carried into checkpoints.
    pub version: Option<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_microsteps: DEFAULT_MAX_MICROSTEPS,
            version: None,
        }
    }
}

impl MachineConfig {
    /// Loads configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_microsteps(mut self, max: usize) -> Self {
        self.max_microsteps = max;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.delimiter, ".");
        assert_eq!(config.max_microsteps, DEFAULT_MAX_MICROSTEPS);
        assert!(config.version.is_none());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(
            MachineConfig::from_json_str("{}").unwrap(),
            MachineConfig::default()
        );
    }

    #[test]
    fn builder_methods_override() {
        let config = MachineConfig::default()
            .with_max_microsteps(5)
            .with_version("2");
        assert_eq!(config.max_microsteps, 5);
        assert_eq!(config.version.as_deref(), Some("2"));
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(MachineConfig::from_json_str(r#"{ "max_microsteps": "many" }"#).is_err());
    }
}

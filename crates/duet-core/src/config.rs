//! Engine configuration.
//!
//! All engine settings are plain data with defaults, loadable from a TOML
//! file.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default cap on the response cascade a single added event can trigger.
pub const MAX_EVENT_RESPONSES: usize = 200;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Event dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Toml)
    }
}

/// Dispatch settings shared by both dispatchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum number of notifications a single added event may cascade
    /// into before further responses are recorded without delivery
    pub max_event_responses: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_event_responses: MAX_EVENT_RESPONSES,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
}

/// Returns the default configuration as a TOML document.
pub fn default_config_toml() -> String {
    r#"# Engine Configuration

[dispatch]
max_event_responses = 200
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.dispatch.max_event_responses, MAX_EVENT_RESPONSES);
    }

    #[test]
    fn test_from_str() {
        let config = EngineConfig::from_str(
            r#"
            [dispatch]
            max_event_responses = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.dispatch.max_event_responses, 12);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = EngineConfig::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_default_config_toml_parses_to_defaults() {
        let config = EngineConfig::from_str(&default_config_toml()).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            EngineConfig::from_str("[dispatch\nmax_event_responses = 12"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::from_file(Path::new("no/such/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

//! Reactive graph configuration
//!
//! ```toml
//! max_notify_depth = 16
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Tunables for a [`ReactiveGraph`](crate::reactive::ReactiveGraph)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReactiveConfig {
    /// How many write -> notify -> write hops may nest before the graph gives up
    #[serde(default = "default_max_notify_depth")]
    pub max_notify_depth: u32,
}

fn default_max_notify_depth() -> u32 {
    64
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            max_notify_depth: default_max_notify_depth(),
        }
    }
}

impl ReactiveConfig {
    /// Parse a config from TOML, filling missing keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReactiveError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = ReactiveConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReactiveConfig::default());
    }

    #[test]
    fn test_parse_depth() {
        let config = ReactiveConfig::from_toml_str("max_notify_depth = 3").unwrap();
        assert_eq!(config.max_notify_depth, 3);
    }

    #[test]
    fn test_invalid_toml() {
        let err = ReactiveConfig::from_toml_str("max_notify_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }
}

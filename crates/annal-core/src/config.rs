//! Configuration for annal.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AnnalError, AnnalResult};

/// Main annal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnalConfig {
    /// Path to the history database.
    pub db_path: PathBuf,
    /// Fields ignored by change detection, applied to every tracked model.
    pub excluded_fields: Vec<String>,
}

impl Default for AnnalConfig {
    fn default() -> Self {
        let annal_dir = dirs::home_dir()
            .map(|h| h.join(".annal"))
            .unwrap_or_else(|| PathBuf::from(".annal"));

        Self {
            db_path: annal_dir.join("history.db"),
            excluded_fields: Vec::new(),
        }
    }
}

impl AnnalConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> AnnalResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| AnnalError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| AnnalError::Configuration(e.to_string()))
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| AnnalError::Configuration(e.to_string()))
            }
            _ => Err(AnnalError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ANNAL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(fields) = std::env::var("ANNAL_EXCLUDED_FIELDS") {
            config.excluded_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnnalConfig::default();
        assert!(config.db_path.ends_with("history.db"));
        assert!(config.excluded_fields.is_empty());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "db_path = \"/tmp/annal/history.db\"\nexcluded_fields = [\"updated_at\"]"
        )
        .unwrap();

        let config = AnnalConfig::from_file(file.path()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/annal/history.db"));
        assert_eq!(config.excluded_fields, vec!["updated_at"]);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = AnnalConfig::from_file(file.path());
        assert!(matches!(result, Err(AnnalError::Configuration(_))));
    }
}

//! Configuration parsing and validation for idlecheck
//!
//! Supports TOML configuration, plus the JSON `config.json` layout used by
//! existing bot plugins (`IDLE_TIME` / `IDLE_CHANNEL` keys):
//! - Documented defaults for every field
//! - Explicit field-by-field merge of loaded values over defaults
//! - Validation with clear error messages

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use idlecheck_util::IdleCheckError;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

impl From<ConfigError> for IdleCheckError {
    fn from(e: ConfigError) -> Self {
        IdleCheckError::config(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a file.
///
/// Files ending in `.json` are parsed as JSON, everything else as TOML.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<IdleConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    debug!(path = %path.display(), json = is_json, "Loading idle-check config");

    if is_json {
        parse_config_json(&content)
    } else {
        parse_config(&content)
    }
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<IdleConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    finish(raw)
}

/// Parse and validate configuration from a JSON string
pub fn parse_config_json(content: &str) -> ConfigResult<IdleConfig> {
    let raw: RawConfig = serde_json::from_str(content)?;
    finish(raw)
}

fn finish(raw: RawConfig) -> ConfigResult<IdleConfig> {
    // Check version
    if let Some(version) = raw.config_version
        && version != CURRENT_CONFIG_VERSION
    {
        return Err(ConfigError::UnsupportedVersion(version));
    }

    // Validate
    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(IdleConfig::from_raw(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use idlecheck_util::AreaId;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, IdleConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1
            idle_time_ms = 60000
            idle_channel = 3
            relocate_retry_ms = 5000
            resync_interval_ms = 10000
        "#;

        let config = parse_config(config).unwrap();
        assert_eq!(config.idle_time, Duration::from_secs(60));
        assert_eq!(config.idle_channel, AreaId::new(3));
        assert_eq!(config.relocate_retry, Duration::from_secs(5));
        assert_eq!(config.resync_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_values() {
        let result = parse_config("idle_time_ms = 0");
        assert!(matches!(
            result,
            Err(ConfigError::ValidationFailed { ref errors }) if errors == &vec![ValidationError::ZeroIdleTime]
        ));
    }

    #[test]
    fn load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "idle_channel = 12").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.idle_channel, AreaId::new(12));
        assert_eq!(config.idle_time, DEFAULT_IDLE_TIME);
    }

    #[test]
    fn load_plugin_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "IDLE_TIME": 300000, "IDLE_CHANNEL": 2 }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.idle_time, Duration::from_millis(300_000));
        assert_eq!(config.idle_channel, AreaId::new(2));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}

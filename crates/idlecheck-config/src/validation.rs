//! Configuration validation

use crate::schema::RawConfig;
use thiserror::Error;

/// Shortest accepted resync period
pub const MIN_RESYNC_INTERVAL_MS: u64 = 1000;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("idle_time_ms must be greater than zero")]
    ZeroIdleTime,

    #[error("relocate_retry_ms must be greater than zero")]
    ZeroRelocateRetry,

    #[error("resync_interval_ms {value} is below the minimum of {min}ms")]
    ResyncIntervalTooShort { value: u64, min: u64 },
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.idle_time_ms == Some(0) {
        errors.push(ValidationError::ZeroIdleTime);
    }

    if config.relocate_retry_ms == Some(0) {
        errors.push(ValidationError::ZeroRelocateRetry);
    }

    if let Some(value) = config.resync_interval_ms
        && value < MIN_RESYNC_INTERVAL_MS
    {
        errors.push(ValidationError::ResyncIntervalTooShort {
            value,
            min: MIN_RESYNC_INTERVAL_MS,
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&RawConfig::default()).is_empty());
    }

    #[test]
    fn collects_all_errors() {
        let config = RawConfig {
            idle_time_ms: Some(0),
            relocate_retry_ms: Some(0),
            resync_interval_ms: Some(10),
            ..RawConfig::default()
        };

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroIdleTime));
        assert!(errors.contains(&ValidationError::ResyncIntervalTooShort {
            value: 10,
            min: MIN_RESYNC_INTERVAL_MS,
        }));
    }
}

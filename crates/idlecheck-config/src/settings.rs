//! Validated idle-check settings

use crate::schema::RawConfig;
use idlecheck_util::{AreaId, millis};
use std::time::Duration;

/// Default permitted inactivity: 15 minutes
pub const DEFAULT_IDLE_TIME: Duration = Duration::from_millis(900_000);

/// Default holding area
pub const DEFAULT_IDLE_CHANNEL: AreaId = AreaId::new(1);

/// Default delay before retrying a failed relocation
pub const DEFAULT_RELOCATE_RETRY: Duration = Duration::from_millis(60_000);

/// Settings used by the idle scheduler. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleConfig {
    /// Permitted inactivity before relocation (`IDLE_TIME`)
    pub idle_time: Duration,

    /// Holding area idle participants are moved into (`IDLE_CHANNEL`)
    pub idle_channel: AreaId,

    /// Delay before re-checking a participant whose relocation send failed
    pub relocate_retry: Duration,

    /// Period of the roster resync pass. None disables it.
    pub resync_interval: Option<Duration>,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_time: DEFAULT_IDLE_TIME,
            idle_channel: DEFAULT_IDLE_CHANNEL,
            relocate_retry: DEFAULT_RELOCATE_RETRY,
            resync_interval: None,
        }
    }
}

impl IdleConfig {
    /// Merge loaded values over `base`, field by field.
    ///
    /// A field present in `raw` replaces the corresponding field of `base`;
    /// an absent field keeps the base value.
    pub fn merge(base: IdleConfig, raw: &RawConfig) -> Self {
        Self {
            idle_time: raw.idle_time_ms.map(millis).unwrap_or(base.idle_time),
            idle_channel: raw
                .idle_channel
                .map(AreaId::new)
                .unwrap_or(base.idle_channel),
            relocate_retry: raw
                .relocate_retry_ms
                .map(millis)
                .unwrap_or(base.relocate_retry),
            resync_interval: raw.resync_interval_ms.map(millis).or(base.resync_interval),
        }
    }

    /// Convert from raw config (after validation), on top of the defaults
    pub fn from_raw(raw: &RawConfig) -> Self {
        Self::merge(Self::default(), raw)
    }

    /// Whether `area` is the holding area
    pub fn is_holding_area(&self, area: AreaId) -> bool {
        area == self.idle_channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IdleConfig::default();
        assert_eq!(config.idle_time, Duration::from_millis(900_000));
        assert_eq!(config.idle_channel, AreaId::new(1));
        assert!(config.resync_interval.is_none());
    }

    #[test]
    fn empty_raw_keeps_defaults() {
        let config = IdleConfig::from_raw(&RawConfig::default());
        assert_eq!(config, IdleConfig::default());
    }

    #[test]
    fn loaded_values_override_base() {
        let base = IdleConfig {
            resync_interval: Some(Duration::from_secs(10)),
            ..IdleConfig::default()
        };
        let raw = RawConfig {
            idle_time_ms: Some(300_000),
            idle_channel: Some(7),
            ..RawConfig::default()
        };

        let merged = IdleConfig::merge(base, &raw);
        assert_eq!(merged.idle_time, Duration::from_millis(300_000));
        assert_eq!(merged.idle_channel, AreaId::new(7));
        assert_eq!(merged.relocate_retry, DEFAULT_RELOCATE_RETRY);
        assert_eq!(merged.resync_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn holding_area_check() {
        let config = IdleConfig::default();
        assert!(config.is_holding_area(AreaId::new(1)));
        assert!(!config.is_holding_area(AreaId::new(2)));
    }
}

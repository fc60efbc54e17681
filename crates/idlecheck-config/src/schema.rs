//! Raw configuration schema (as parsed from TOML or JSON)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from disk.
///
/// Every field is optional; absent fields fall back to the defaults in
/// [`IdleConfig`](crate::IdleConfig). Unknown fields are ignored so config
/// files shared with other plugins still load.
///
/// `IDLE_TIME` and `IDLE_CHANNEL` are aliases of `idle_time_ms` and
/// `idle_channel`, not separate settings. A file that sets both spellings of
/// the same field is rejected as a duplicate field; use one or the other.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: Option<u32>,

    /// Permitted inactivity before relocation, in milliseconds
    #[serde(alias = "IDLE_TIME")]
    pub idle_time_ms: Option<u64>,

    /// Area idle participants are moved into
    #[serde(alias = "IDLE_CHANNEL")]
    pub idle_channel: Option<u64>,

    /// Delay before retrying a relocation whose send failed, in milliseconds
    pub relocate_retry_ms: Option<u64>,

    /// Period of the roster resync pass, in milliseconds (absent = disabled)
    pub resync_interval_ms: Option<u64>,
}

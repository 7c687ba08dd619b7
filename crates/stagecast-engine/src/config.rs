//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;

/// Default media load timeout in milliseconds.
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 15_000;

/// Default maximum automatic media retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before a media retry in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Lower bound applied to every configured interval.
const MIN_INTERVAL_MS: u64 = 10;

/// Tunables for the whole engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub media: MediaLoadPolicy,
    pub sync: SyncConfig,
    pub embed: EmbedPolicy,
    pub overlay: OverlayPolicy,
}

impl EngineConfig {
    /// Parse a configuration from JSON and clamp invalid values.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        Ok(config.validated())
    }

    /// Read a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Clamp values that would stall or spin the engine.
    pub fn validated(mut self) -> Self {
        clamp_ms("media.load_timeout_ms", &mut self.media.load_timeout_ms);
        clamp_ms("media.retry_delay_ms", &mut self.media.retry_delay_ms);
        clamp_ms("sync.query_timeout_ms", &mut self.sync.query_timeout_ms);
        clamp_ms("embed.poll_interval_ms", &mut self.embed.poll_interval_ms);
        clamp_ms("overlay.banner_dwell_ms", &mut self.overlay.banner_dwell_ms);
        clamp_ms("overlay.banner_fade_ms", &mut self.overlay.banner_fade_ms);

        if self.overlay.default_rotation_interval_secs == 0 {
            warn!("overlay.default_rotation_interval_secs is 0, using 1");
            self.overlay.default_rotation_interval_secs = 1;
        }

        for (name, policy) in [
            ("sync.video", &mut self.sync.video),
            ("sync.embedded", &mut self.sync.embedded),
        ] {
            if !policy.drift_threshold_secs.is_finite() || policy.drift_threshold_secs < 0.0 {
                warn!(
                    "{}.drift_threshold_secs is invalid ({}), using 0",
                    name, policy.drift_threshold_secs
                );
                policy.drift_threshold_secs = 0.0;
            }
        }

        self
    }
}

fn clamp_ms(name: &str, value: &mut u64) {
    if *value < MIN_INTERVAL_MS {
        warn!("{} is {}ms, using {}ms", name, value, MIN_INTERVAL_MS);
        *value = MIN_INTERVAL_MS;
    }
}

/// Loading policy for local media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLoadPolicy {
    /// How long one load attempt may take.
    pub load_timeout_ms: u64,

    /// Maximum number of automatic retries after a load error.
    pub max_retries: u32,

    /// Delay before a retry.
    pub retry_delay_ms: u64,
}

impl Default for MediaLoadPolicy {
    fn default() -> Self {
        Self {
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl MediaLoadPolicy {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Check if another retry is allowed after `retry_count` retries.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

/// Drift handling for one player kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Maximum tolerated difference before a corrective seek, in seconds.
    pub drift_threshold_secs: f64,

    /// Whether controller `sync` commands re-run drift correction.
    pub periodic_resync: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            drift_threshold_secs: 1.0,
            periodic_resync: false,
        }
    }
}

/// Position sync settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local video.
    pub video: SyncPolicy,

    /// Embedded widget.
    pub embedded: SyncPolicy,

    /// How long to wait for a query reply.
    pub query_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            video: SyncPolicy::default(),
            embedded: SyncPolicy {
                drift_threshold_secs: 0.5,
                periodic_resync: true,
            },
            query_timeout_ms: 3_000,
        }
    }
}

impl SyncConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Embedded widget creation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedPolicy {
    /// Interval between host API readiness checks.
    pub poll_interval_ms: u64,

    /// Readiness checks before giving up.
    pub max_poll_attempts: u32,
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_poll_attempts: 50,
        }
    }
}

impl EmbedPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Overlay timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayPolicy {
    /// How long the announcement banner stays fully visible.
    pub banner_dwell_ms: u64,

    /// Length of the banner fade-out.
    pub banner_fade_ms: u64,

    /// Rotation interval when a tool update does not carry one.
    pub default_rotation_interval_secs: u64,
}

impl Default for OverlayPolicy {
    fn default() -> Self {
        Self {
            banner_dwell_ms: 10_000,
            banner_fade_ms: 1_000,
            default_rotation_interval_secs: 5,
        }
    }
}

impl OverlayPolicy {
    pub fn banner_dwell(&self) -> Duration {
        Duration::from_millis(self.banner_dwell_ms)
    }

    pub fn banner_fade(&self) -> Duration {
        Duration::from_millis(self.banner_fade_ms)
    }

    pub fn default_rotation_interval(&self) -> Duration {
        Duration::from_secs(self.default_rotation_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.media.load_timeout(), Duration::from_secs(15));
        assert_eq!(config.media.max_retries, 3);
        assert_eq!(config.media.retry_delay(), Duration::from_secs(2));
        assert!(config.sync.embedded.drift_threshold_secs < config.sync.video.drift_threshold_secs);
        assert!(config.sync.embedded.periodic_resync);
        assert!(!config.sync.video.periodic_resync);
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json_str(r#"{"media":{"max_retries":5},"sync":{"video":{"periodic_resync":true}}}"#)
                .unwrap();
        assert_eq!(config.media.max_retries, 5);
        assert_eq!(config.media.load_timeout_ms, DEFAULT_LOAD_TIMEOUT_MS);
        assert!(config.sync.video.periodic_resync);
        assert_eq!(config.sync.video.drift_threshold_secs, 1.0);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = EngineConfig::from_json_str(
            r#"{"embed":{"poll_interval_ms":0},"overlay":{"default_rotation_interval_secs":0}}"#,
        )
        .unwrap();
        assert_eq!(config.embed.poll_interval_ms, MIN_INTERVAL_MS);
        assert_eq!(config.overlay.default_rotation_interval_secs, 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json_str("[1,2"),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_media_policy_should_retry() {
        let policy = MediaLoadPolicy::default();

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}

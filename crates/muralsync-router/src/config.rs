//! Engine configuration.

use std::time::Duration;

use muralsync_reaper::ReaperConfig;
use muralsync_session::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for [`spawn_engine`](crate::spawn_engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Used to build the in-memory store. Ignored by
    /// [`spawn_engine_with_store`](crate::spawn_engine_with_store).
    pub store: StoreConfig,
    pub reaper: ReaperConfig,
    /// Capacity of the command channel. Senders wait when it is full.
    pub channel_size: usize,
    /// How often session counts are logged. Zero disables.
    pub stats_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            reaper: ReaperConfig::default(),
            channel_size: 256,
            stats_interval: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    /// Clamp and fix any out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.channel_size == 0 {
            warn!("channel_size must be at least 1, using 1");
            self.channel_size = 1;
        }
        self.store = self.store.validated();
        self.reaper = self.reaper.validated();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logs_stats_every_five_minutes() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stats_interval, Duration::from_secs(300));
        assert_eq!(cfg.reaper.period, Duration::from_secs(60));
    }

    #[test]
    fn test_validated_zero_channel_size_becomes_one() {
        let cfg = EngineConfig {
            channel_size: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(cfg.channel_size, 1);
    }
}

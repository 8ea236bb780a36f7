//! Process-level settings: where to listen and how long a silent socket
//! may live.

use std::time::Duration;

use muralsync_router::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Listener and connection settings plus the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed. Clients
    /// keep an otherwise idle socket open with `heartbeat`.
    pub connection_timeout: Duration,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            connection_timeout: Duration::from_secs(60),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Replaces a zero connection timeout with the default.
    pub fn validated(mut self) -> Self {
        if self.connection_timeout.is_zero() {
            let fallback = Self::default().connection_timeout;
            warn!(?fallback, "connection_timeout is zero, using default");
            self.connection_timeout = fallback;
        }
        self.engine = self.engine.validated();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_loopback() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validated_zero_timeout_falls_back_to_default() {
        let config = ServerConfig {
            connection_timeout: Duration::ZERO,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validated_keeps_sane_values() {
        let config = ServerConfig {
            bind_addr: "0.0.0.0:9000".into(),
            connection_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(config.clone().validated(), config);
    }
}

//! `MuralServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport, JSON codec, and the sync
//! engine that owns every session.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use muralsync_protocol::{Codec, JsonCodec};
use muralsync_reaper::ReaperConfig;
use muralsync_router::{EngineConfig, EngineHandle, spawn_engine};
use muralsync_session::StoreConfig;
use muralsync_transport::{Transport, WebSocketTransport};
use tracing::{debug, error, info};

use crate::MuralError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;

/// Shared state handed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) engine: EngineHandle,
    pub(crate) codec: C,
    pub(crate) connection_timeout: Duration,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use muralsync::prelude::*;
///
/// # async fn run() -> Result<(), MuralError> {
/// let server = MuralServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MuralServerBuilder {
    config: ServerConfig,
}

impl MuralServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.config.engine = config;
        self
    }

    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.config.engine.store = config;
        self
    }

    pub fn reaper_config(mut self, config: ReaperConfig) -> Self {
        self.config.engine.reaper = config;
        self
    }

    /// How long a connection may stay silent before it is closed.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Binds the listener and starts the engine.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn build(self) -> Result<MuralServer, MuralError> {
        let config = self.config.validated();
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;
        let engine = spawn_engine(config.engine.clone());

        let state = Arc::new(ServerState {
            engine,
            codec: JsonCodec,
            connection_timeout: config.connection_timeout,
        });

        Ok(MuralServer {
            transport,
            state,
            config,
        })
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting connections.
pub struct MuralServer {
    transport: WebSocketTransport,
    state: Arc<ServerState<JsonCodec>>,
    config: ServerConfig,
}

impl MuralServer {
    pub fn builder() -> MuralServerBuilder {
        MuralServerBuilder::new()
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, MuralError> {
        Ok(self.transport.local_addr()?)
    }

    /// Handle to the sync engine, for stats and shutdown.
    pub fn engine(&self) -> EngineHandle {
        self.state.engine.clone()
    }

    /// The effective (validated) configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the accept loop, spawning one handler task per connection.
    ///
    /// Returns once the engine has stopped.
    pub async fn run(mut self) -> Result<(), MuralError> {
        info!(addr = %self.config.bind_addr, "muralsync server running");

        while !self.state.engine.is_closed() {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }

        info!("engine stopped, no longer accepting connections");
        Ok(())
    }
}

//! # muralsync
//!
//! Realtime shared-canvas sync server. Clients create or join a session by
//! short code and then see each other's sticky notes, freehand strokes and
//! text labels appear live.
//!
//! The server is one process: a WebSocket listener, one task per
//! connection, and a single engine task that owns every session and applies
//! commands one at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use muralsync::prelude::*;
//!
//! # async fn run() -> Result<(), MuralError> {
//! init_tracing();
//! let server = MuralServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod logging;
pub mod server;

pub use config::ServerConfig;
pub use error::MuralError;
pub use logging::{DEFAULT_LOG_FILTER, init_tracing};
pub use server::{MuralServer, MuralServerBuilder};

pub use muralsync_geometry as geometry;
pub use muralsync_protocol as protocol;
pub use muralsync_reaper as reaper;
pub use muralsync_router as router;
pub use muralsync_session as session;
pub use muralsync_transport as transport;

/// Everything needed to configure, run and talk to a server.
pub mod prelude {
    pub use crate::{
        MuralError, MuralServer, MuralServerBuilder, ServerConfig, init_tracing,
    };
    pub use muralsync_protocol::{
        CanvasSnapshot, CanvasText, ClientCommand, Codec, ConnectionId, Drawing, EraseArea,
        ItemId, JsonCodec, Note, NoteDraft, ServerEvent, SessionCode, TextDraft,
    };
    pub use muralsync_reaper::ReaperConfig;
    pub use muralsync_router::{EngineConfig, EngineHandle, RouterError};
    pub use muralsync_session::{StoreConfig, StoreError, StoreStats};
}

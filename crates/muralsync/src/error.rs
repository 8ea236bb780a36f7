//! Unified error type for the muralsync server.

use muralsync_protocol::ProtocolError;
use muralsync_router::RouterError;
use muralsync_session::StoreError;
use muralsync_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` conversions let `?` lift transport, codec, store and engine
/// failures into one type at the process boundary.
#[derive(Debug, thiserror::Error)]
pub enum MuralError {
    /// Socket accept, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The engine task has stopped.
    #[error(transparent)]
    Router(#[from] RouterError),
}

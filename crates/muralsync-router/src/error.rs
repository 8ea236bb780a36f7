//! Error types for the router layer.

/// Errors returned by an [`EngineHandle`](crate::EngineHandle).
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The engine task has stopped, or dropped the reply.
    #[error("sync engine is unavailable")]
    Unavailable,
}

//! Error types for the session layer.

use std::fmt;

use muralsync_protocol::{ItemId, SessionCode};

/// Which per-session collection an insertion targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Note,
    Drawing,
    Text,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note => write!(f, "notes"),
            Self::Drawing => write!(f, "drawings"),
            Self::Text => write!(f, "texts"),
        }
    }
}

/// Errors returned by a [`SessionStore`](crate::SessionStore).
///
/// The `Display` text of the client-facing variants is exactly what the
/// `error` event carries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A join referenced a code with no live session.
    #[error("Invalid session code")]
    InvalidSessionCode(SessionCode),

    /// A mutation targeted a session that no longer exists (reaped while a
    /// connection was still bound to it).
    #[error("session {0} not found")]
    SessionNotFound(SessionCode),

    /// The collection is full. Nothing was inserted.
    #[error("Maximum number of {kind} reached for this session")]
    CapacityExceeded { kind: ContentKind, limit: usize },

    /// No note with this id exists in the session.
    #[error("note {0} not found")]
    NoteNotFound(ItemId),

    /// No canvas text with this id exists in the session.
    #[error("text {0} not found")]
    TextNotFound(ItemId),

    /// The submitted path has an odd number of values or fewer than two
    /// points.
    #[error("Invalid drawing path")]
    InvalidDrawing { len: usize },

    /// Every attempt to draw an unused code collided with a live session.
    #[error("Unable to create session")]
    CodeSpaceExhausted { attempts: usize },
}

impl StoreError {
    /// Whether the requester should hear about this failure.
    ///
    /// Missing notes, texts and sessions are expected races between members
    /// and are dropped quietly.
    pub fn is_reportable(&self) -> bool {
        !matches!(
            self,
            Self::SessionNotFound(_) | Self::NoteNotFound(_) | Self::TextNotFound(_)
        )
    }
}

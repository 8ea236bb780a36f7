//! A single shared canvas and the rule that decides when it may be dropped.

use std::collections::HashSet;

use muralsync_protocol::{CanvasSnapshot, CanvasText, ConnectionId, Drawing, Note, SessionCode};
use tokio::time::Instant;

use crate::StoreConfig;

/// One shared canvas.
///
/// Owned by the store. Callers only ever see it through a shared borrow
/// for the duration of a call.
#[derive(Debug, Clone)]
pub struct Session {
    pub code: SessionCode,
    pub notes: Vec<Note>,
    pub drawings: Vec<Drawing>,
    pub texts: Vec<CanvasText>,
    /// Connections currently bound to this session.
    pub members: HashSet<ConnectionId>,
    pub last_active_at: Instant,
    pub created_at: Instant,
}

impl Session {
    /// A fresh, empty session whose only member is `creator`.
    pub fn new(code: SessionCode, creator: ConnectionId, now: Instant) -> Self {
        Self {
            code,
            notes: Vec::new(),
            drawings: Vec::new(),
            texts: Vec::new(),
            members: HashSet::from([creator]),
            last_active_at: now,
            created_at: now,
        }
    }

    /// Whether the session may be deleted at `now`.
    ///
    /// True when nobody is bound and it has been idle longer than
    /// `idle_timeout`, or when it is older than `max_age` regardless of
    /// members. Both the periodic sweep and lazy lookups use this.
    pub fn is_evictable(&self, now: Instant, config: &StoreConfig) -> bool {
        let idle = now.saturating_duration_since(self.last_active_at);
        let age = now.saturating_duration_since(self.created_at);
        (self.members.is_empty() && idle > config.idle_timeout) || age > config.max_age
    }

    /// Copies the three content collections.
    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            notes: self.notes.clone(),
            drawings: self.drawings.clone(),
            canvas_texts: self.texts.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.drawings.is_empty() && self.texts.is_empty()
    }
}

//! The store abstraction the router talks to.

use muralsync_protocol::{
    CanvasText, ConnectionId, Drawing, EraseArea, ItemId, Note, NoteDraft, SessionCode, TextDraft,
};

use crate::{Session, StoreError};

/// Aggregate counts for periodic logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub session_count: usize,
    pub total_members: usize,
}

/// Owns every live session.
///
/// Every lookup, including those inside the mutation methods, first evicts
/// the session if [`Session::is_evictable`] holds, so a stale session behaves
/// as absent whether or not a sweep has run.
///
/// Methods take `&mut self` and never block. The store is owned by a single
/// task; nothing here is synchronised.
pub trait SessionStore: Send + 'static {
    /// Creates an empty session with `requester` as its only member.
    ///
    /// # Errors
    /// [`StoreError::CodeSpaceExhausted`] if no unused code was found.
    fn create(&mut self, requester: ConnectionId) -> Result<SessionCode, StoreError>;

    /// Returns the session if it is live, evicting it if stale.
    fn get(&mut self, code: &SessionCode) -> Option<&Session>;

    /// Adds `id` to the members and refreshes activity. `false` if absent.
    fn add_member(&mut self, code: &SessionCode, id: ConnectionId) -> bool;

    /// Removes `id` from the members and refreshes activity. An empty
    /// session is left for the idle timeout to collect.
    fn remove_member(&mut self, code: &SessionCode, id: ConnectionId);

    /// Refreshes `last_active_at`.
    fn touch(&mut self, code: &SessionCode);

    fn add_note(&mut self, code: &SessionCode, draft: NoteDraft) -> Result<Note, StoreError>;

    /// Replaces the note with the same id.
    fn update_note(&mut self, code: &SessionCode, note: Note) -> Result<(), StoreError>;

    fn delete_note(&mut self, code: &SessionCode, id: &ItemId) -> Result<(), StoreError>;

    fn add_text(&mut self, code: &SessionCode, draft: TextDraft) -> Result<CanvasText, StoreError>;

    fn delete_text(&mut self, code: &SessionCode, id: &ItemId) -> Result<(), StoreError>;

    /// Appends a drawing.
    ///
    /// # Errors
    /// [`StoreError::InvalidDrawing`] unless the path has an even length of
    /// at least four, or [`StoreError::CapacityExceeded`].
    fn add_drawing(&mut self, code: &SessionCode, drawing: Drawing) -> Result<(), StoreError>;

    /// Removes points and text anchors inside the circle. Returns whether
    /// anything changed.
    fn apply_erase(&mut self, code: &SessionCode, area: EraseArea) -> bool;

    /// Empties notes, drawings and texts. `false` if the session is absent.
    fn clear(&mut self, code: &SessionCode) -> bool;

    /// Deletes every evictable session and returns their codes.
    fn sweep(&mut self) -> Vec<SessionCode>;

    fn stats(&self) -> StoreStats;

    /// Drops all sessions.
    fn shutdown(&mut self);
}

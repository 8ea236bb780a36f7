//! In-process [`SessionStore`] backed by a `HashMap`.

use std::collections::HashMap;

use muralsync_geometry::{EraseCircle, is_drawable};
use muralsync_protocol::{
    CanvasText, ConnectionId, Drawing, EraseArea, ItemId, Note, NoteDraft, SessionCode, TextDraft,
};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::ids::{random_code, random_item_id};
use crate::{ContentKind, Session, SessionStore, StoreConfig, StoreError, StoreStats};

/// How many random codes `create` draws before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 64;

/// Keeps every session in this process's memory.
///
/// Not thread-safe by itself: the engine task owns it and serialises all
/// access.
pub struct InMemorySessionStore {
    sessions: HashMap<SessionCode, Session>,
    config: StoreConfig,
    alphabet: Vec<char>,
    code_space: u128,
}

impl InMemorySessionStore {
    pub fn new(config: StoreConfig) -> Self {
        let config = config.validated();
        let alphabet = config.code_alphabet.chars().collect();
        let code_space = config.code_space();
        Self {
            sessions: HashMap::new(),
            config,
            alphabet,
            code_space,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of sessions held, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Deletes the session if it is evictable at `now`. Returns whether it
    /// was deleted.
    fn evict_if_eligible(&mut self, code: &SessionCode, now: Instant) -> bool {
        let eligible = self
            .sessions
            .get(code)
            .is_some_and(|s| s.is_evictable(now, &self.config));
        if eligible {
            self.sessions.remove(code);
            info!(%code, "session reaped");
        }
        eligible
    }

    fn live_mut(&mut self, code: &SessionCode) -> Option<&mut Session> {
        if self.evict_if_eligible(code, Instant::now()) {
            return None;
        }
        self.sessions.get_mut(code)
    }

    fn live_or_missing(&mut self, code: &SessionCode) -> Result<&mut Session, StoreError> {
        self.live_mut(code)
            .ok_or_else(|| StoreError::SessionNotFound(code.clone()))
    }

    fn is_code_space_full(&self) -> bool {
        self.sessions.len() as u128 >= self.code_space
    }

    fn unused_code(&self) -> Result<SessionCode, StoreError> {
        if self.is_code_space_full() {
            return Err(StoreError::CodeSpaceExhausted { attempts: 0 });
        }
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = random_code(&self.alphabet, self.config.code_length);
            if !self.sessions.contains_key(&code) {
                return Ok(code);
            }
            debug!(%code, "session code collision, retrying");
        }
        Err(StoreError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}

/// An id not yet used by any note or text in `session`.
fn unused_item_id(session: &Session) -> ItemId {
    loop {
        let id = random_item_id();
        let taken = session.notes.iter().any(|n| n.id == id)
            || session.texts.iter().any(|t| t.id == id);
        if !taken {
            return id;
        }
    }
}

fn check_capacity(len: usize, limit: usize, kind: ContentKind) -> Result<(), StoreError> {
    if len >= limit {
        return Err(StoreError::CapacityExceeded { kind, limit });
    }
    Ok(())
}

impl SessionStore for InMemorySessionStore {
    fn create(&mut self, requester: ConnectionId) -> Result<SessionCode, StoreError> {
        if self.sessions.len() > self.config.sweep_ceiling || self.is_code_space_full() {
            let reaped = self.sweep();
            debug!(
                reaped = reaped.len(),
                ceiling = self.config.sweep_ceiling,
                "opportunistic sweep on create"
            );
        }

        let code = self.unused_code()?;
        let session = Session::new(code.clone(), requester, Instant::now());
        self.sessions.insert(code.clone(), session);

        info!(%code, connection_id = %requester, "session created");
        Ok(code)
    }

    fn get(&mut self, code: &SessionCode) -> Option<&Session> {
        if self.evict_if_eligible(code, Instant::now()) {
            return None;
        }
        self.sessions.get(code)
    }

    fn add_member(&mut self, code: &SessionCode, id: ConnectionId) -> bool {
        let Some(session) = self.live_mut(code) else {
            return false;
        };
        session.members.insert(id);
        session.last_active_at = Instant::now();
        info!(%code, connection_id = %id, members = session.members.len(), "member joined");
        true
    }

    fn remove_member(&mut self, code: &SessionCode, id: ConnectionId) {
        let Some(session) = self.live_mut(code) else {
            return;
        };
        session.last_active_at = Instant::now();
        if session.members.remove(&id) {
            info!(%code, connection_id = %id, members = session.members.len(), "member left");
        }
    }

    fn touch(&mut self, code: &SessionCode) {
        if let Some(session) = self.live_mut(code) {
            session.last_active_at = Instant::now();
        }
    }

    fn add_note(&mut self, code: &SessionCode, draft: NoteDraft) -> Result<Note, StoreError> {
        let limit = self.config.max_notes;
        let session = self.live_or_missing(code)?;
        check_capacity(session.notes.len(), limit, ContentKind::Note)?;

        let note = draft.into_note(unused_item_id(session));
        session.notes.push(note.clone());
        debug!(%code, note_id = %note.id, "note added");
        Ok(note)
    }

    fn update_note(&mut self, code: &SessionCode, note: Note) -> Result<(), StoreError> {
        let session = self.live_or_missing(code)?;
        let slot = session
            .notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| StoreError::NoteNotFound(note.id.clone()))?;
        *slot = note;
        Ok(())
    }

    fn delete_note(&mut self, code: &SessionCode, id: &ItemId) -> Result<(), StoreError> {
        let session = self.live_or_missing(code)?;
        let before = session.notes.len();
        session.notes.retain(|n| &n.id != id);
        if session.notes.len() == before {
            return Err(StoreError::NoteNotFound(id.clone()));
        }
        debug!(%code, note_id = %id, "note deleted");
        Ok(())
    }

    fn add_text(&mut self, code: &SessionCode, draft: TextDraft) -> Result<CanvasText, StoreError> {
        let limit = self.config.max_texts;
        let session = self.live_or_missing(code)?;
        check_capacity(session.texts.len(), limit, ContentKind::Text)?;

        let text = draft.into_text(unused_item_id(session));
        session.texts.push(text.clone());
        debug!(%code, text_id = %text.id, "text added");
        Ok(text)
    }

    fn delete_text(&mut self, code: &SessionCode, id: &ItemId) -> Result<(), StoreError> {
        let session = self.live_or_missing(code)?;
        let before = session.texts.len();
        session.texts.retain(|t| &t.id != id);
        if session.texts.len() == before {
            return Err(StoreError::TextNotFound(id.clone()));
        }
        debug!(%code, text_id = %id, "text deleted");
        Ok(())
    }

    fn add_drawing(&mut self, code: &SessionCode, drawing: Drawing) -> Result<(), StoreError> {
        let limit = self.config.max_drawings;
        let session = self.live_or_missing(code)?;
        if !is_drawable(&drawing.path) {
            return Err(StoreError::InvalidDrawing {
                len: drawing.path.len(),
            });
        }
        check_capacity(session.drawings.len(), limit, ContentKind::Drawing)?;
        session.drawings.push(drawing);
        Ok(())
    }

    fn apply_erase(&mut self, code: &SessionCode, area: EraseArea) -> bool {
        let Some(session) = self.live_mut(code) else {
            return false;
        };
        let circle = EraseCircle::new(area.x, area.y, area.radius);
        let mut changed = false;

        session.drawings.retain_mut(|drawing| {
            let trimmed = circle.erase(&drawing.path);
            if trimmed.len() == drawing.path.len() {
                return true;
            }
            changed = true;
            if is_drawable(&trimmed) {
                drawing.path = trimmed;
                true
            } else {
                false
            }
        });

        let texts_before = session.texts.len();
        session.texts.retain(|t| !circle.contains(t.x, t.y));
        changed |= session.texts.len() != texts_before;

        if changed {
            debug!(%code, x = area.x, y = area.y, radius = area.radius, "erase applied");
        }
        changed
    }

    fn clear(&mut self, code: &SessionCode) -> bool {
        let Some(session) = self.live_mut(code) else {
            return false;
        };
        session.notes.clear();
        session.drawings.clear();
        session.texts.clear();
        debug!(%code, "canvas cleared");
        true
    }

    fn sweep(&mut self) -> Vec<SessionCode> {
        let now = Instant::now();
        let stale: Vec<SessionCode> = self
            .sessions
            .values()
            .filter(|s| s.is_evictable(now, &self.config))
            .map(|s| s.code.clone())
            .collect();
        for code in &stale {
            self.evict_if_eligible(code, now);
        }
        stale
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            session_count: self.sessions.len(),
            total_members: self.sessions.values().map(|s| s.members.len()).sum(),
        }
    }

    fn shutdown(&mut self) {
        let dropped = self.sessions.len();
        self.sessions.clear();
        info!(dropped, "session store shut down");
    }
}

// =========================================================================
// Tests
// =========================================================================

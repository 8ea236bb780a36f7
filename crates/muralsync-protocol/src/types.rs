//! Wire types for the shared canvas.
//!
//! Every type here travels on the wire as JSON. Commands and events are
//! adjacently tagged: `{"event": "addNote", "data": {...}}`. Unit variants
//! such as `createSession` carry no `data` field at all.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short code that identifies a session, e.g. `"K7Q2ZD"`.
///
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Wraps a raw code string. No validation happens here; an unknown code
    /// is simply not found by the store.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned identifier of a note or canvas text, unique within its
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Canvas content
// ---------------------------------------------------------------------------

/// A sticky note. Any member may move, edit or delete any note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: ItemId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

/// A note as submitted by a client, before the server assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    /// Opaque token the client uses to reconcile its optimistic copy.
    /// Older clients send it as `tempId`.
    #[serde(default, alias = "tempId", skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// A freehand stroke.
///
/// `path` is a flat `[x0, y0, x1, y1, ...]` sequence. A stored drawing
/// always has an even number of values and at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub path: Vec<f64>,
    pub color: String,
    pub width: f64,
}

/// Floating text anchored at a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasText {
    pub id: ItemId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub font_size: f64,
}

/// A canvas text as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDraft {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub font_size: f64,
}

impl TextDraft {
    /// Attaches a server-assigned id.
    pub fn into_text(self, id: ItemId) -> CanvasText {
        CanvasText {
            id,
            text: self.text,
            x: self.x,
            y: self.y,
            color: self.color,
            font_size: self.font_size,
        }
    }
}

impl NoteDraft {
    /// Attaches a server-assigned id, discarding the correlation token.
    pub fn into_note(self, id: ItemId) -> Note {
        Note {
            id,
            text: self.text,
            x: self.x,
            y: self.y,
            color: self.color,
        }
    }
}

/// The circle removed by an `eraseArea` command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EraseArea {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Full state of a session's canvas, sent on create, join and after an
/// erase that changed something.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub notes: Vec<Note>,
    pub drawings: Vec<Drawing>,
    pub canvas_texts: Vec<CanvasText>,
}

/// Payload of `noteAdded`. The token is present only in the copy sent to
/// the connection that created the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAdded {
    #[serde(flatten)]
    pub note: Note,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// A command sent by a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    CreateSession,
    JoinSession(SessionCode),
    AddNote(NoteDraft),
    UpdateNote(Note),
    DeleteNote(ItemId),
    AddText(TextDraft),
    DeleteText(ItemId),
    Draw(Drawing),
    EraseArea(EraseArea),
    ClearCanvas,
    DisconnectFromSession,
    /// Keep-alive. Answered by the connection handler; never reaches the
    /// session engine.
    #[serde(rename_all = "camelCase")]
    Heartbeat { client_time: u64 },
}

impl ClientCommand {
    /// The wire name of this command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::CreateSession => "createSession",
            ClientCommand::JoinSession(_) => "joinSession",
            ClientCommand::AddNote(_) => "addNote",
            ClientCommand::UpdateNote(_) => "updateNote",
            ClientCommand::DeleteNote(_) => "deleteNote",
            ClientCommand::AddText(_) => "addText",
            ClientCommand::DeleteText(_) => "deleteText",
            ClientCommand::Draw(_) => "draw",
            ClientCommand::EraseArea(_) => "eraseArea",
            ClientCommand::ClearCanvas => "clearCanvas",
            ClientCommand::DisconnectFromSession => "disconnectFromSession",
            ClientCommand::Heartbeat { .. } => "heartbeat",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// An event pushed to one or more connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    SessionCreated(SessionCode),
    SessionData(CanvasSnapshot),
    NoteAdded(NoteAdded),
    NoteUpdated(Note),
    NoteDeleted(ItemId),
    TextAdded(CanvasText),
    TextDeleted(ItemId),
    Drawing(Drawing),
    CanvasCleared,
    SessionLeft,
    /// Human-readable failure, sent to the requester only.
    Error(String),
    #[serde(rename_all = "camelCase")]
    HeartbeatAck { client_time: u64, server_time: u64 },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

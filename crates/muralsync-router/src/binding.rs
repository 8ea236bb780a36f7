//! Which session, if any, a connection is bound to.

use muralsync_protocol::SessionCode;

/// Per-connection binding state.
///
/// ```text
///   Unbound ──(create / join)──→ BoundTo(code)
///      ↑                            │
///      └────(leave / disconnect)────┘
/// ```
///
/// A create or join while bound moves straight to the new session; the old
/// membership is released by the router first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Binding {
    #[default]
    Unbound,
    BoundTo(SessionCode),
}

impl Binding {
    /// The bound session, if any.
    pub fn session(&self) -> Option<&SessionCode> {
        match self {
            Self::Unbound => None,
            Self::BoundTo(code) => Some(code),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::BoundTo(_))
    }

    /// Binds to `code`, returning the session previously bound.
    pub fn bind(&mut self, code: SessionCode) -> Option<SessionCode> {
        match std::mem::replace(self, Self::BoundTo(code)) {
            Self::Unbound => None,
            Self::BoundTo(previous) => Some(previous),
        }
    }

    /// Returns to `Unbound`, yielding the session that was bound.
    pub fn release(&mut self) -> Option<SessionCode> {
        match std::mem::take(self) {
            Self::Unbound => None,
            Self::BoundTo(previous) => Some(previous),
        }
    }
}

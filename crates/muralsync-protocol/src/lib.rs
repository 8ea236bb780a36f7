//! Wire protocol for muralsync.
//!
//! - **Types** ([`ClientCommand`], [`ServerEvent`], [`Note`], [`Drawing`],
//!   [`CanvasText`], ...) that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) that turns them into frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about sessions or connections beyond
//! re-exporting [`ConnectionId`] for the crates above it.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use muralsync_transport::ConnectionId;
pub use types::{
    CanvasSnapshot, CanvasText, ClientCommand, Drawing, EraseArea, ItemId, Note, NoteAdded,
    NoteDraft, ServerEvent, SessionCode, TextDraft,
};

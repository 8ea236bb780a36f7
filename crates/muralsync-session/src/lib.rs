//! Session storage for muralsync.
//!
//! A session is one shared canvas: its notes, drawings and texts, the set
//! of connections bound to it, and two timestamps that decide when it may
//! be thrown away.
//!
//! ```text
//! Router (above)  ← binds connections, fans out events
//!     ↕
//! Session layer (this crate)  ← owns canvases, enforces caps, evicts
//!     ↕
//! Protocol (below)  ← Note, Drawing, CanvasText, SessionCode
//! ```
//!
//! Eviction has exactly one rule, [`Session::is_evictable`]. The store
//! applies it lazily on every lookup and eagerly in [`SessionStore::sweep`].

mod config;
mod error;
mod ids;
mod memory;
mod session;
mod store;

pub use config::{DEFAULT_CODE_ALPHABET, StoreConfig};
pub use error::{ContentKind, StoreError};
pub use memory::{InMemorySessionStore, MAX_CODE_ATTEMPTS};
pub use session::Session;
pub use store::{SessionStore, StoreStats};

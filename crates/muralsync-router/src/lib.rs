//! Routing and fan-out for muralsync.
//!
//! # Key types
//!
//! - [`Binding`] — per-connection `Unbound` / `BoundTo(code)` state
//! - [`BroadcastRouter`] — applies commands to the store and decides who
//!   hears about them
//! - [`EngineHandle`] — talks to the single task that owns all session state
//! - [`EngineConfig`] — store, reaper, channel and stats settings

mod binding;
mod config;
mod engine;
mod error;
mod router;

pub use binding::Binding;
pub use config::EngineConfig;
pub use engine::{ConnectionSender, EngineHandle, spawn_engine, spawn_engine_with_store};
pub use error::RouterError;
pub use router::{BroadcastRouter, Delivery};

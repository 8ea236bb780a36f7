//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Characters session codes are drawn from by default.
pub const DEFAULT_CODE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Limits and timeouts for an [`InMemorySessionStore`](crate::InMemorySessionStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Length of generated session codes.
    pub code_length: usize,
    /// Characters session codes are drawn from.
    pub code_alphabet: String,
    /// Per-session cap on notes.
    pub max_notes: usize,
    /// Per-session cap on drawings.
    pub max_drawings: usize,
    /// Per-session cap on canvas texts.
    pub max_texts: usize,
    /// A session with no members becomes evictable once it has been
    /// inactive for longer than this.
    pub idle_timeout: Duration,
    /// A session older than this is evictable even with members present.
    pub max_age: Duration,
    /// Live session count above which `create` sweeps first.
    pub sweep_ceiling: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_alphabet: DEFAULT_CODE_ALPHABET.to_string(),
            max_notes: 200,
            max_drawings: 1000,
            max_texts: 200,
            idle_timeout: Duration::from_secs(15 * 60),
            max_age: Duration::from_secs(24 * 60 * 60),
            sweep_ceiling: 100,
        }
    }
}

impl StoreConfig {
    /// Longest code the store will generate.
    pub const MAX_CODE_LENGTH: usize = 32;

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`InMemorySessionStore::new`](crate::InMemorySessionStore::new).
    /// - `code_length` forced into `1..=MAX_CODE_LENGTH`.
    /// - An empty `code_alphabet` falls back to [`DEFAULT_CODE_ALPHABET`];
    ///   repeated characters are dropped.
    pub fn validated(mut self) -> Self {
        if self.code_length == 0 || self.code_length > Self::MAX_CODE_LENGTH {
            let clamped = self.code_length.clamp(1, Self::MAX_CODE_LENGTH);
            warn!(
                code_length = self.code_length,
                clamped, "code_length out of range, clamping"
            );
            self.code_length = clamped;
        }

        let mut seen = Vec::new();
        for c in self.code_alphabet.chars() {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        if seen.is_empty() {
            warn!("code_alphabet is empty, using default");
            self.code_alphabet = DEFAULT_CODE_ALPHABET.to_string();
        } else if seen.len() != self.code_alphabet.chars().count() {
            warn!(
                alphabet = %self.code_alphabet,
                "code_alphabet has repeated characters, removing duplicates"
            );
            self.code_alphabet = seen.into_iter().collect();
        }
        self
    }

    /// Number of distinct codes this config can produce, saturating at
    /// `u128::MAX`.
    pub fn code_space(&self) -> u128 {
        let base = self.code_alphabet.chars().count() as u128;
        let exp = u32::try_from(self.code_length).unwrap_or(u32::MAX);
        base.checked_pow(exp).unwrap_or(u128::MAX)
    }
}

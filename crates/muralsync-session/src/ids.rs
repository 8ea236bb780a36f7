//! Random identifiers.

use muralsync_protocol::{ItemId, SessionCode};
use rand::Rng;

const ITEM_ID_ALPHABET: &[u8] = b"1234567890abcdef";
const ITEM_ID_LENGTH: usize = 10;

/// Draws one candidate code. Uniqueness is the caller's job.
pub(crate) fn random_code(alphabet: &[char], length: usize) -> SessionCode {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect();
    SessionCode::new(code)
}

/// A 10-character lowercase hex id for notes and texts.
pub(crate) fn random_item_id() -> ItemId {
    let mut rng = rand::rng();
    let id: String = (0..ITEM_ID_LENGTH)
        .map(|_| ITEM_ID_ALPHABET[rng.random_range(0..ITEM_ID_ALPHABET.len())] as char)
        .collect();
    ItemId::new(id)
}

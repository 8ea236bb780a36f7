//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The connection handler only needs something that implements [`Codec`];
//! [`JsonCodec`] is the one clients speak today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a UTF-8 string, for text frames.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` if the encoding is not text.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use muralsync_protocol::{ClientCommand, Codec, JsonCodec, SessionCode};
///
/// let codec = JsonCodec;
/// let cmd: ClientCommand = codec
///     .decode(br#"{"event":"joinSession","data":"ABC123"}"#)
///     .unwrap();
/// assert_eq!(cmd, ClientCommand::JoinSession(SessionCode::new("ABC123")));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientCommand, ServerEvent, SessionCode};

    #[test]
    fn test_json_codec_decodes_client_command() {
        let cmd: ClientCommand = JsonCodec.decode(br#"{"event":"clearCanvas"}"#).unwrap();
        assert_eq!(cmd, ClientCommand::ClearCanvas);
    }

    #[test]
    fn test_json_codec_encode_text_matches_wire_format() {
        let text = JsonCodec
            .encode_text(&ServerEvent::SessionCreated(SessionCode::new("ABCDEF")))
            .unwrap();
        assert_eq!(text, r#"{"event":"sessionCreated","data":"ABCDEF"}"#);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<ClientCommand, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_empty_input_returns_error() {
        let result: Result<ClientCommand, _> = JsonCodec.decode(b"");
        assert!(result.is_err());
    }
}

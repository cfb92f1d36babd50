//! JSON text codec for gateway messages
//!
//! WebSocket frames already delimit messages, so the codec only maps a
//! single text frame to a single message and back.

use crate::error::ProtocolError;
use crate::message::{ClientMessage, ServerMessage};

/// Maximum accepted size of an inbound text frame (1 MiB)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Codec for gateway messages carried in WebSocket text frames
#[derive(Debug, Clone, Copy)]
pub struct MessageCodec {
    max_message_size: usize,
}

impl MessageCodec {
    /// Create a codec with the default size limit
    pub fn new() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Create a codec with a custom size limit
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    /// Decode a client message from a text frame.
    ///
    /// Returns `Ok(None)` for valid JSON whose `type` is missing or not one
    /// of [`ClientMessage::KINDS`]; such messages are meant to be skipped.
    /// Invalid JSON, a known `type` with ill-typed fields, and oversized
    /// frames are errors.
    pub fn decode_client(&self, text: &str) -> Result<Option<ClientMessage>, ProtocolError> {
        self.check_size(text)?;
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some(kind) if ClientMessage::KINDS.contains(&kind) => {
                Ok(Some(serde_json::from_value(value)?))
            }
            _ => Ok(None),
        }
    }

    /// Encode a server message into a text frame
    pub fn encode_server(&self, message: &ServerMessage) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(message)?)
    }

    /// Encode a client message (used by clients and tests)
    pub fn encode_client(&self, message: &ClientMessage) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(message)?)
    }

    /// Decode a server message (used by clients and tests)
    pub fn decode_server(&self, text: &str) -> Result<ServerMessage, ProtocolError> {
        self.check_size(text)?;
        Ok(serde_json::from_str(text)?)
    }

    fn check_size(&self, text: &str) -> Result<(), ProtocolError> {
        if text.len() > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size: text.len(),
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_start_session() {
        let codec = MessageCodec::new();
        let msg = codec
            .decode_client(
                r#"{"type":"start_session","hostname":"10.0.0.5","username":"pi","password":"x","cols":100,"rows":30}"#,
            )
            .unwrap()
            .unwrap();

        assert_eq!(
            msg,
            ClientMessage::StartSession {
                hostname: "10.0.0.5".into(),
                username: "pi".into(),
                password: "x".into(),
                cols: Some(100),
                rows: Some(30),
            }
        );
    }

    #[test]
    fn test_decode_start_ssh_alias_without_dimensions() {
        let codec = MessageCodec::new();
        let msg = codec
            .decode_client(r#"{"type":"start_ssh","hostname":"h","username":"u","password":"p"}"#)
            .unwrap()
            .unwrap();

        match msg {
            ClientMessage::StartSession { cols, rows, .. } => {
                assert_eq!(cols, None);
                assert_eq!(rows, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_input_preserves_payload() {
        let codec = MessageCodec::new();
        let msg = codec
            .decode_client(r#"{"type":"input","data":"ls -la\r\u001b[A"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Input {
                data: "ls -la\r\u{1b}[A".into()
            }
        );
    }

    #[test]
    fn test_decode_resize_missing_fields_default_to_zero() {
        let codec = MessageCodec::new();
        let msg = codec
            .decode_client(r#"{"type":"resize","cols":120}"#)
            .unwrap()
            .unwrap();
        assert_eq!(msg, ClientMessage::Resize { cols: 120, rows: 0 });
    }

    #[test]
    fn test_decode_input_without_data_is_empty() {
        let codec = MessageCodec::new();
        let msg = codec.decode_client(r#"{"type":"input"}"#).unwrap().unwrap();
        assert_eq!(msg, ClientMessage::Input { data: String::new() });
    }

    #[test]
    fn test_decode_skips_unknown_or_missing_type() {
        let codec = MessageCodec::new();
        assert_eq!(codec.decode_client(r#"{"type":"reboot"}"#).unwrap(), None);
        assert_eq!(codec.decode_client(r#"{"type":"ping","seq":4}"#).unwrap(), None);
        assert_eq!(codec.decode_client(r#"{"data":"ls"}"#).unwrap(), None);
        assert_eq!(codec.decode_client("[1,2]").unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_ill_typed_known_message() {
        let codec = MessageCodec::new();
        let err = codec
            .decode_client(r#"{"type":"resize","cols":"wide"}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let codec = MessageCodec::new();
        assert!(codec.decode_client("{not json").is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let codec = MessageCodec::with_max_message_size(16);
        let err = codec
            .decode_client(r#"{"type":"input","data":"0123456789"}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { max: 16, .. }));
    }

    #[test]
    fn test_encode_server_messages() {
        let codec = MessageCodec::new();
        assert_eq!(
            codec.encode_server(&ServerMessage::data("pi@raspberrypi:~ $ ")).unwrap(),
            r#"{"type":"ssh_data","data":"pi@raspberrypi:~ $ "}"#
        );
        assert_eq!(
            codec.encode_server(&ServerMessage::error("auth failed")).unwrap(),
            r#"{"type":"ssh_error","data":"auth failed"}"#
        );
    }
}

//! JSON message types carried in frame bodies.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known `cmd` tags pushed by the open live platform.
pub mod cmd {
    /// Danmaku (chat message).
    pub const DANMAKU: &str = "LIVE_OPEN_PLATFORM_DM";
    /// Gift sent.
    pub const SEND_GIFT: &str = "LIVE_OPEN_PLATFORM_SEND_GIFT";
    /// Super chat posted.
    pub const SUPER_CHAT: &str = "LIVE_OPEN_PLATFORM_SUPER_CHAT";
    /// Super chat withdrawn.
    pub const SUPER_CHAT_DEL: &str = "LIVE_OPEN_PLATFORM_SUPER_CHAT_DEL";
    /// Guard membership purchased.
    pub const GUARD: &str = "LIVE_OPEN_PLATFORM_GUARD";
    /// Room liked.
    pub const LIKE: &str = "LIVE_OPEN_PLATFORM_LIKE";
    /// The app session was ended by the platform.
    pub const INTERACTION_END: &str = "LIVE_OPEN_PLATFORM_INTERACTION_END";
}

/// A decoded business event.
///
/// `cmd` is the event-type tag; `data` is the event payload. Any other
/// top-level fields are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMessage {
    pub cmd: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApplicationMessage {
    /// Creates a message with the given tag and payload.
    pub fn new(cmd: impl Into<String>, data: Value) -> Self {
        Self {
            cmd: cmd.into(),
            data,
            extra: Map::new(),
        }
    }

    /// Parses a message from a raw frame body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(serde_json::from_str(text)?)
    }

    /// Deserializes `data` into a typed payload.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Body of an auth reply frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthReply {
    /// Zero on success.
    pub code: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthReply {
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_slice() {
        let body = br#"{"cmd":"LIVE_OPEN_PLATFORM_DM","data":{"uname":"alice","msg":"hi"}}"#;
        let msg = ApplicationMessage::from_slice(body).unwrap();
        assert_eq!(msg.cmd, cmd::DANMAKU);
        assert_eq!(msg.data["uname"], "alice");
        assert!(msg.extra.is_empty());
    }

    #[test]
    fn test_message_without_data() {
        let msg = ApplicationMessage::from_slice(br#"{"cmd":"X"}"#).unwrap();
        assert_eq!(msg.cmd, "X");
        assert!(msg.data.is_null());
    }

    #[test]
    fn test_message_preserves_extra_fields() {
        let body = br#"{"cmd":"X","data":1,"msg_id":"abc-1"}"#;
        let msg = ApplicationMessage::from_slice(body).unwrap();
        assert_eq!(msg.extra["msg_id"], "abc-1");

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"cmd": "X", "data": 1, "msg_id": "abc-1"}));
    }

    #[test]
    fn test_message_missing_cmd() {
        let result = ApplicationMessage::from_slice(br#"{"data":{}}"#);
        assert!(matches!(result, Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_message_invalid_utf8() {
        let result = ApplicationMessage::from_slice(&[0x7b, 0xff, 0xfe, 0x7d]);
        assert!(matches!(result, Err(ProtocolError::InvalidUtf8)));
    }

    #[test]
    fn test_message_data_as() {
        #[derive(Deserialize)]
        struct Danmaku {
            uname: String,
            msg: String,
        }

        let msg = ApplicationMessage::new(cmd::DANMAKU, json!({"uname": "bob", "msg": "yo"}));
        let dm: Danmaku = msg.data_as().unwrap();
        assert_eq!(dm.uname, "bob");
        assert_eq!(dm.msg, "yo");
    }

    #[test]
    fn test_auth_reply() {
        let ok = AuthReply::from_slice(br#"{"code":0}"#).unwrap();
        assert!(ok.is_success());

        let rejected = AuthReply::from_slice(br#"{"code":-101,"msg":"bad key"}"#).unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.code, -101);
        assert_eq!(rejected.extra["msg"], "bad key");
    }
}

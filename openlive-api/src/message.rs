//! Request and response bodies.

use serde::{Deserialize, Serialize};

/// Response envelope shared by every call.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AppStartRequest<'a> {
    pub code: &'a str,
    pub app_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AppEndRequest<'a> {
    pub app_id: i64,
    pub game_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct HeartbeatRequest<'a> {
    pub game_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BatchHeartbeatRequest<'a> {
    pub game_ids: &'a [String],
}

/// Result of starting an app session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppStartResult {
    pub game_info: GameInfo,
    pub websocket_info: WebsocketInfo,
    #[serde(default)]
    pub anchor_info: Option<AnchorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: String,
}

/// Feed endpoints and the auth body to send on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketInfo {
    pub auth_body: String,
    pub wss_link: Vec<String>,
}

impl WebsocketInfo {
    /// The endpoint to connect to: the last advertised link.
    pub fn preferred_link(&self) -> Option<&str> {
        self.wss_link.last().map(String::as_str)
    }
}

/// The streamer whose room the app session is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorInfo {
    pub room_id: i64,
    #[serde(default)]
    pub uname: String,
    #[serde(default)]
    pub uface: String,
    #[serde(default)]
    pub uid: i64,
    #[serde(default)]
    pub open_id: String,
}

/// Result of a batch heartbeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchHeartbeatResult {
    /// Game ids the platform no longer recognises.
    #[serde(default)]
    pub failed_game_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_app_start() {
        let json = r#"{
            "code": 0,
            "message": "0",
            "request_id": "abc",
            "data": {
                "game_info": {"game_id": "g-1"},
                "websocket_info": {
                    "auth_body": "{\"key\":\"v\"}",
                    "wss_link": ["wss://a/sub", "wss://b/sub"]
                },
                "anchor_info": {
                    "room_id": 42,
                    "uname": "streamer",
                    "uface": "https://x/face.jpg",
                    "uid": 7,
                    "open_id": "o-1"
                }
            }
        }"#;

        let resp: ApiResponse<AppStartResult> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.request_id, "abc");

        let data = resp.data.unwrap();
        assert_eq!(data.game_info.game_id, "g-1");
        assert_eq!(data.websocket_info.preferred_link(), Some("wss://b/sub"));
        assert_eq!(data.anchor_info.unwrap().room_id, 42);
    }

    #[test]
    fn test_parse_error_envelope_without_data() {
        let json = r#"{"code": 7007, "message": "bad code", "request_id": "r"}"#;
        let resp: ApiResponse<AppStartResult> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, 7007);
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_parse_batch_heartbeat() {
        let json = r#"{"code":0,"data":{"failed_game_ids":["g-2"]}}"#;
        let resp: ApiResponse<BatchHeartbeatResult> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.unwrap().failed_game_ids, vec!["g-2"]);

        let json = r#"{"code":0,"data":{}}"#;
        let resp: ApiResponse<BatchHeartbeatResult> = serde_json::from_str(json).unwrap();
        assert!(resp.data.unwrap().failed_game_ids.is_empty());
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_string(&AppStartRequest {
            code: "ABC",
            app_id: 1649539569084,
        })
        .unwrap();
        assert_eq!(body, r#"{"code":"ABC","app_id":1649539569084}"#);

        let ids = vec!["a".to_string(), "b".to_string()];
        let body = serde_json::to_string(&BatchHeartbeatRequest { game_ids: &ids }).unwrap();
        assert_eq!(body, r#"{"game_ids":["a","b"]}"#);
    }

    #[test]
    fn test_preferred_link_empty() {
        let info = WebsocketInfo {
            auth_body: String::new(),
            wss_link: vec![],
        };
        assert_eq!(info.preferred_link(), None);
    }
}

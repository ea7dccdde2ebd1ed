//! Control-plane REST client.

use crate::error::ApiError;
use crate::message::{
    ApiResponse, AppEndRequest, AppStartRequest, AppStartResult, BatchHeartbeatRequest,
    BatchHeartbeatResult, HeartbeatRequest,
};
use crate::signing::Credentials;
use crate::status;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default control-plane endpoint.
pub const DEFAULT_BASE_URL: &str = "https://live-open.biliapi.com/";

/// Default per-request timeout (10 s).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; API paths are appended to it.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL for an API path such as `v2/app/start`.
    pub fn endpoint(&self, api: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            api.trim_start_matches('/')
        )
    }
}

/// Signed client for the control-plane API.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    credentials: Credentials,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(credentials: Credentials, config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Starts an app session for the streamer identified by `code`.
    pub async fn app_start(&self, app_id: i64, code: &str) -> Result<AppStartResult, ApiError> {
        let result: AppStartResult = self
            .post("v2/app/start", &AppStartRequest { code, app_id })
            .await?
            .ok_or(ApiError::MissingData("app start"))?;

        tracing::info!(
            game_id = %result.game_info.game_id,
            links = result.websocket_info.wss_link.len(),
            "App session started"
        );
        Ok(result)
    }

    /// Ends an app session.
    pub async fn app_end(&self, app_id: i64, game_id: &str) -> Result<(), ApiError> {
        self.post::<_, serde_json::Value>("v2/app/end", &AppEndRequest { app_id, game_id })
            .await?;
        tracing::info!(game_id = %game_id, "App session ended");
        Ok(())
    }

    /// Keeps one app session alive.
    pub async fn heartbeat(&self, game_id: &str) -> Result<(), ApiError> {
        self.post::<_, serde_json::Value>("v2/app/heartbeat", &HeartbeatRequest { game_id })
            .await?;
        tracing::debug!(game_id = %game_id, "App heartbeat sent");
        Ok(())
    }

    /// Keeps several app sessions alive with one call.
    pub async fn batch_heartbeat(
        &self,
        game_ids: &[String],
    ) -> Result<BatchHeartbeatResult, ApiError> {
        let result = self
            .post::<_, BatchHeartbeatResult>(
                "v2/app/batchHeartbeat",
                &BatchHeartbeatRequest { game_ids },
            )
            .await?
            .unwrap_or_default();

        if !result.failed_game_ids.is_empty() {
            tracing::warn!(
                "Batch heartbeat failed for {} of {} game(s)",
                result.failed_game_ids.len(),
                game_ids.len()
            );
        }
        Ok(result)
    }

    /// Sends a signed POST and unwraps the response envelope.
    ///
    /// Returns the envelope's `data`, which may be absent on success.
    pub async fn post<P, T>(&self, api: &str, params: &P) -> Result<Option<T>, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(params)?;
        let signed = self.credentials.sign_now(&body)?;
        let url = self.config.endpoint(api);

        tracing::debug!("POST {} ({} bytes)", url, body.len());

        let mut request = self
            .http
            .post(&url)
            .header("Authorization", &signed.authorization)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (name, value) in &signed.headers {
            request = request.header(*name, value);
        }

        let response = request.body(body).send().await?;
        let http_status = response.status();
        let bytes = response.bytes().await?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !http_status.is_success() => {
                return Err(ApiError::HttpStatus {
                    status: http_status.as_u16(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            request_id = %envelope.request_id,
            "{} -> HTTP {}, code {}",
            api,
            http_status.as_u16(),
            envelope.code
        );

        if !status::is_success(envelope.code) {
            let err = ApiError::from_code(envelope.code);
            tracing::warn!("{} failed: {} ({})", api, err, envelope.message);
            return Err(err);
        }

        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{content_md5, HEADER_CONTENT_MD5};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A request captured by the mock server.
    struct Captured {
        head: String,
        body: Vec<u8>,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<String> {
            self.head.lines().find_map(|line| {
                let (n, v) = line.split_once(':')?;
                n.trim()
                    .eq_ignore_ascii_case(name)
                    .then(|| v.trim().to_string())
            })
        }
    }

    /// Serves one canned response and returns what the client sent.
    async fn serve_once(
        status_line: &'static str,
        response_body: &'static str,
    ) -> (String, tokio::task::JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let (head, body_start) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break (String::from_utf8_lossy(&buf[..pos]).to_string(), pos + 4);
                }
            };

            let content_length: usize = head
                .lines()
                .find_map(|l| {
                    let (n, v) = l.split_once(':')?;
                    n.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse().unwrap())
                })
                .unwrap_or(0);
            while buf.len() < body_start + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                response_body.len(),
                response_body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            Captured {
                head,
                body: buf[body_start..body_start + content_length].to_vec(),
            }
        });

        (base_url, handle)
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            Credentials::new("test-key", "test-secret"),
            ApiConfig::default().with_base_url(base_url),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_join() {
        let config = ApiConfig::default();
        assert_eq!(
            config.endpoint("v2/app/start"),
            "https://live-open.biliapi.com/v2/app/start"
        );

        let config = ApiConfig::default().with_base_url("http://localhost:8080");
        assert_eq!(config.endpoint("/v2/app/end"), "http://localhost:8080/v2/app/end");
    }

    #[tokio::test]
    async fn test_app_start_signed_request() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"code":0,"message":"0","request_id":"r1","data":{
                "game_info":{"game_id":"g-1"},
                "websocket_info":{"auth_body":"{}","wss_link":["wss://a/sub","wss://b/sub"]},
                "anchor_info":{"room_id":42,"uname":"u","uface":"","uid":1,"open_id":"o"}}}"#,
        )
        .await;

        let result = client(&base_url).app_start(1001, "CODE").await.unwrap();
        assert_eq!(result.game_info.game_id, "g-1");
        assert_eq!(result.websocket_info.preferred_link(), Some("wss://b/sub"));

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("POST /v2/app/start "));
        assert_eq!(captured.body, br#"{"code":"CODE","app_id":1001}"#);
        assert_eq!(
            captured.header(HEADER_CONTENT_MD5).unwrap(),
            content_md5(&captured.body)
        );
        assert_eq!(
            captured.header("x-bili-accesskeyid").as_deref(),
            Some("test-key")
        );
        assert_eq!(captured.header("authorization").unwrap().len(), 64);
        assert_eq!(
            captured.header("content-type").as_deref(),
            Some("application/json")
        );
        assert_eq!(captured.header("accept").as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_status_error() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"code":7003,"message":"expired","request_id":"r2","data":null}"#,
        )
        .await;

        let err = client(&base_url).heartbeat("g-1").await.unwrap_err();
        assert_eq!(err.code(), Some(7003));
        assert!(err.to_string().contains("heartbeat expired"));

        let captured = server.await.unwrap();
        assert_eq!(captured.body, br#"{"game_id":"g-1"}"#);
    }

    #[tokio::test]
    async fn test_app_start_missing_data() {
        let (base_url, _server) =
            serve_once("HTTP/1.1 200 OK", r#"{"code":0,"message":"0"}"#).await;

        let err = client(&base_url).app_start(1, "c").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingData(_)));
    }

    #[tokio::test]
    async fn test_http_error_without_envelope() {
        let (base_url, _server) =
            serve_once("HTTP/1.1 502 Bad Gateway", "upstream unavailable").await;

        let err = client(&base_url).app_end(1, "g").await.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 502 }));
    }

    #[tokio::test]
    async fn test_batch_heartbeat() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"code":0,"data":{"failed_game_ids":["g-2"]}}"#,
        )
        .await;

        let ids = vec!["g-1".to_string(), "g-2".to_string()];
        let result = client(&base_url).batch_heartbeat(&ids).await.unwrap();
        assert_eq!(result.failed_game_ids, vec!["g-2"]);

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("POST /v2/app/batchHeartbeat "));
        assert_eq!(captured.body, br#"{"game_ids":["g-1","g-2"]}"#);
    }
}

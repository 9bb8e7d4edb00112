//! Mock Telegram Bot API for testing notification delivery

use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const BOT_TOKEN: &str = "123456:TEST-TOKEN";
pub const CHAT_ID: &str = "-100200300";

pub struct MockTelegramServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockTelegramServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    fn send_message_path() -> String {
        format!("/bot{}/sendMessage", BOT_TOKEN)
    }

    pub async fn mock_success(&self) {
        Mock::given(method("POST"))
            .and(path(Self::send_message_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 1 }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path(Self::send_message_path()))
            .respond_with(ResponseTemplate::new(status_code).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail the first `times` requests, then succeed
    pub async fn mock_flaky(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(Self::send_message_path()))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
        self.mock_success().await;
    }

    /// JSON bodies of every request received so far
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|req| req.body_json::<Value>().ok())
            .collect()
    }
}

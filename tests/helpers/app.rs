//! Full application wiring against a test database, a temp staging
//! directory and the mock WeChat server.

use super::db::{seed_test_platform, TestDb};
use super::wechat_mock::MockWeChat;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use steward::cache::TokenCache;
use steward::media::MediaStore;
use steward::settings::Settings;
use steward::web::{router, AppState};
use steward::wechat::ComponentClient;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SLUG: &str = "acme";
pub const TEST_COMPONENT_APP_ID: &str = "wx-component";
pub const TEST_SUB_APP_ID: &str = "wx-sub";

pub struct TestApp {
    pub router: Router,
    pub db: TestDb,
    pub mock: MockWeChat,
    pub state: AppState,
    _media_dir: TempDir,
}

impl TestApp {
    /// Seeded app: one platform ("acme" / "wx-component") with a verify
    /// ticket already delivered, so component token exchange works.
    pub async fn spawn() -> Self {
        let db = TestDb::new().await;
        seed_test_platform(db.connection(), TEST_SLUG, TEST_COMPONENT_APP_ID).await;

        let (base_url, mock) = MockWeChat::spawn().await;
        let media_dir = TempDir::new().expect("Failed to create media dir");

        let mut settings = Settings::default();
        settings.server.public_base_url = Some("http://steward.test".to_string());
        settings.media.root = media_dir.path().to_path_buf();

        let tokens = TokenCache::new();
        let wechat = ComponentClient::with_base_url(tokens.clone(), &base_url)
            .expect("Failed to build client");
        wechat.store_verify_ticket(TEST_COMPONENT_APP_ID, "mock-ticket");

        let state = AppState {
            settings: Arc::new(settings),
            db: db.connection().clone(),
            wechat,
            media: MediaStore::new(media_dir.path()),
            tokens,
        };

        Self {
            router: router(state.clone()),
            db,
            mock,
            state,
            _media_dir: media_dir,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .expect("Failed to build request"),
        )
        .await
    }

    pub async fn delete_json(&self, uri: &str, body: Value) -> Response {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .expect("Failed to build request"),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
    }
}

/// Decode a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body was not JSON")
}

/// Build a multipart upload body with a `type` field and the given files.
pub fn multipart_body(media_type: &str, files: &[(&str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "steward-test-boundary".to_string();
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"type\"\r\n\r\n");
    body.extend_from_slice(media_type.as_bytes());
    body.extend_from_slice(b"\r\n");

    for (name, bytes) in files {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

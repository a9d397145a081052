//! Stand-in for the WeChat Open Platform API.
//!
//! Serves canned JSON per endpoint path, with per-test overrides, and
//! records every request so tests can assert on what was sent.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockWeChat {
    overrides: Arc<Mutex<HashMap<String, Value>>>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockWeChat {
    /// Start the mock on an ephemeral port; returns its base URL.
    pub async fn spawn() -> (String, MockWeChat) {
        let mock = MockWeChat::default();
        let app = Router::new()
            .fallback(any(mock_handler))
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().expect("Failed to read mock addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock server failed");
        });

        (format!("http://{addr}"), mock)
    }

    /// Replace the response for one endpoint path.
    pub fn set_response(&self, path: &str, value: Value) {
        self.overrides
            .lock()
            .unwrap()
            .insert(path.to_string(), value);
    }

    /// All (path, body) pairs received so far.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body)
            .collect()
    }
}

async fn mock_handler(State(mock): State<MockWeChat>, request: Request<Body>) -> Json<Value> {
    let path = request.uri().path().to_string();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    // Multipart uploads land here too; record those as null bodies
    let body = serde_json::from_slice::<Value>(&bytes).unwrap_or(Value::Null);
    mock.requests.lock().unwrap().push((path.clone(), body));

    if let Some(value) = mock.overrides.lock().unwrap().get(&path) {
        return Json(value.clone());
    }
    Json(default_response(&path))
}

fn default_response(path: &str) -> Value {
    match path {
        "/cgi-bin/component/api_component_token" => json!({
            "component_access_token": "mock-component-token",
            "expires_in": 7200,
        }),
        "/cgi-bin/component/api_get_authorizer_info" => json!({
            "authorization_info": {
                "authorizer_appid": "wx-sub",
                "authorizer_refresh_token": "mock-refresh-token",
                "expires_in": 7200,
            }
        }),
        "/cgi-bin/component/api_authorizer_token" => json!({
            "authorizer_access_token": "mock-authorizer-token",
            "expires_in": 7200,
            "authorizer_refresh_token": "mock-refresh-token",
        }),
        "/cgi-bin/component/api_create_preauthcode" => json!({
            "pre_auth_code": "mock-pre-auth-code",
            "expires_in": 600,
        }),
        "/cgi-bin/component/api_query_auth" => json!({
            "authorization_info": {
                "authorizer_appid": "wx-sub",
                "authorizer_access_token": "mock-authorizer-token",
                "authorizer_refresh_token": "mock-refresh-token",
                "expires_in": 7200,
            }
        }),
        "/cgi-bin/component/get_domain_confirmfile" => json!({
            "errcode": 0,
            "errmsg": "ok",
            "file_name": "mock-confirm.txt",
            "file_content": "mock-content",
        }),
        "/cgi-bin/openapi/rid/get" => json!({
            "errcode": 0,
            "errmsg": "ok",
            "request": { "invoke_time": 1, "error_msg": "mock" },
        }),
        "/cgi-bin/account/getaccountbasicinfo" => json!({
            "errcode": 0,
            "errmsg": "ok",
            "appid": "wx-sub",
            "nickname": "Mock Mini Program",
        }),
        "/cgi-bin/media/upload" => json!({
            "errcode": 0,
            "errmsg": "ok",
            "type": "image",
            "media_id": "mock-media-id",
            "created_at": "1",
        }),
        "/wxa/bind_tester" => json!({
            "errcode": 0,
            "errmsg": "ok",
            "userstr": "mock-user-str",
        }),
        "/wxa/unbind_tester" => json!({ "errcode": 0, "errmsg": "ok" }),
        "/wxa/memberauth" => json!({ "errcode": 0, "errmsg": "ok", "members": [] }),
        _ => json!({ "errcode": 0, "errmsg": "ok" }),
    }
}

//! Authorizer resolution and the per-sub-account capability surface.
//!
//! `resolve` turns an (open platform, app id) pair into a `SubApplication`
//! handle bound to the refresh token the remote reports. The handle is
//! built fresh per request; callers needing amortized cost add their own
//! caching. All capability calls are passthroughs: the remote JSON is
//! handed back unchanged, errcode included.

use crate::entities::open_platform;
use crate::errors::StewardError;
use crate::media::{guess_mime, MediaType};
use crate::wechat::client::ComponentClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Map, Value};
use std::path::Path;

/// The slice of the query-authorizer response the resolver needs.
#[derive(Debug, Clone)]
pub struct AuthorizationInfo {
    pub authorizer_app_id: Option<String>,
    pub refresh_token: String,
}

/// Decode a query-authorizer response.
///
/// `authorization_info` present means success; otherwise a non-zero errcode
/// is the remote's failure. Zero errcode without authorization_info fails
/// closed rather than reading the missing key.
pub fn parse_authorization(response: &Value) -> Result<AuthorizationInfo, StewardError> {
    match response.get("authorization_info") {
        Some(info) => {
            let refresh_token = info
                .get("authorizer_refresh_token")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    StewardError::remote(0, "authorization_info carries no authorizer_refresh_token")
                })?;
            Ok(AuthorizationInfo {
                authorizer_app_id: info
                    .get("authorizer_appid")
                    .and_then(Value::as_str)
                    .map(String::from),
                refresh_token: refresh_token.to_string(),
            })
        }
        None => {
            let code = response.get("errcode").and_then(Value::as_i64).unwrap_or(0);
            if code != 0 {
                let message = response
                    .get("errmsg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Err(StewardError::remote(code, message))
            } else {
                Err(StewardError::remote(
                    0,
                    "authorization_info missing from zero-errcode response",
                ))
            }
        }
    }
}

/// Resolve an authorized sub-account into a handle scoped to
/// (platform, app id, refresh token). Fails closed: no refresh token, no
/// handle.
pub async fn resolve(
    client: &ComponentClient,
    platform: &open_platform::Model,
    app_id: &str,
) -> Result<SubApplication, StewardError> {
    let response = client.query_authorizer(platform, app_id).await?;
    let info = parse_authorization(&response)?;
    Ok(SubApplication {
        client: client.clone(),
        platform: platform.clone(),
        app_id: app_id.to_string(),
        refresh_token: info.refresh_token,
    })
}

/// Capability handle for one authorized mini-program.
#[derive(Clone)]
pub struct SubApplication {
    client: ComponentClient,
    platform: open_platform::Model,
    app_id: String,
    refresh_token: String,
}

impl SubApplication {
    async fn access_token(&self) -> Result<String, StewardError> {
        self.client
            .authorizer_access_token(&self.platform, &self.app_id, &self.refresh_token)
            .await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, StewardError> {
        let token = self.access_token().await?;
        let mut url = self
            .client
            .base_url()
            .join(path)
            .map_err(|e| StewardError::InvalidParameter(format!("bad endpoint {path}: {e}")))?;
        url.query_pairs_mut().append_pair("access_token", &token);
        let resp = self.client.http().post(url).json(body).send().await?;
        Ok(resp.json::<Value>().await?)
    }

    pub fn account(&self) -> AccountApi<'_> {
        AccountApi { app: self }
    }

    pub fn setting(&self) -> SettingApi<'_> {
        SettingApi { app: self }
    }

    pub fn tester(&self) -> TesterApi<'_> {
        TesterApi { app: self }
    }

    pub fn media(&self) -> MediaApi<'_> {
        MediaApi { app: self }
    }

    pub fn app_code(&self) -> AppCodeApi<'_> {
        AppCodeApi { app: self }
    }
}

/// Basic account info, avatar and signature management.
pub struct AccountApi<'a> {
    app: &'a SubApplication,
}

impl AccountApi<'_> {
    pub async fn basic_info(&self) -> Result<Value, StewardError> {
        self.app
            .post("/cgi-bin/account/getaccountbasicinfo", &json!({}))
            .await
    }

    /// Crop coordinates default to the full image when not supplied.
    pub async fn update_avatar(
        &self,
        head_img_media_id: &str,
        crop: Option<(f64, f64, f64, f64)>,
    ) -> Result<Value, StewardError> {
        let (x1, y1, x2, y2) = crop.unwrap_or((0.0, 0.0, 1.0, 1.0));
        self.app
            .post(
                "/cgi-bin/account/modifyheadimage",
                &json!({
                    "head_img_media_id": head_img_media_id,
                    "x1": x1, "y1": y1, "x2": x2, "y2": y2,
                }),
            )
            .await
    }

    pub async fn update_signature(&self, signature: &str) -> Result<Value, StewardError> {
        self.app
            .post(
                "/cgi-bin/account/modifysignature",
                &json!({ "signature": signature }),
            )
            .await
    }
}

/// Nickname availability, audit status and change requests.
pub struct SettingApi<'a> {
    app: &'a SubApplication,
}

#[derive(Debug, Clone, Default)]
pub struct NicknameRequest {
    pub nick_name: String,
    pub id_card: Option<String>,
    pub license: Option<String>,
    /// Up to five supporting material media ids
    pub other_stuffs: Vec<String>,
}

/// A license submission supersedes the id card, mirroring the remote API's
/// either-or contract.
fn nickname_body(req: &NicknameRequest) -> Value {
    let mut body = Map::new();
    body.insert("nick_name".to_string(), json!(req.nick_name));
    if let Some(license) = &req.license {
        body.insert("id_card".to_string(), json!(""));
        body.insert("license".to_string(), json!(license));
    } else {
        body.insert(
            "id_card".to_string(),
            json!(req.id_card.clone().unwrap_or_default()),
        );
        body.insert("license".to_string(), json!(""));
    }
    for (i, media_id) in req.other_stuffs.iter().take(5).enumerate() {
        body.insert(format!("naming_other_stuff_{}", i + 1), json!(media_id));
    }
    Value::Object(body)
}

impl SettingApi<'_> {
    pub async fn is_available_nickname(&self, nick_name: &str) -> Result<Value, StewardError> {
        self.app
            .post(
                "/cgi-bin/wxverify/checkwxverifynickname",
                &json!({ "nick_name": nick_name }),
            )
            .await
    }

    pub async fn nickname_audit_status(&self, audit_id: &str) -> Result<Value, StewardError> {
        self.app
            .post("/wxa/api_wxa_querynickname", &json!({ "audit_id": audit_id }))
            .await
    }

    pub async fn set_nickname(&self, req: &NicknameRequest) -> Result<Value, StewardError> {
        self.app.post("/wxa/setnickname", &nickname_body(req)).await
    }
}

/// Experience-tester management.
pub struct TesterApi<'a> {
    app: &'a SubApplication,
}

impl TesterApi<'_> {
    pub async fn list(&self) -> Result<Value, StewardError> {
        self.app
            .post("/wxa/memberauth", &json!({ "action": "get_experiencer" }))
            .await
    }

    pub async fn bind(&self, wechat_id: &str) -> Result<Value, StewardError> {
        self.app
            .post("/wxa/bind_tester", &json!({ "wechatid": wechat_id }))
            .await
    }

    pub async fn unbind_by_wechat_id(&self, wechat_id: &str) -> Result<Value, StewardError> {
        self.app
            .post("/wxa/unbind_tester", &json!({ "wechatid": wechat_id }))
            .await
    }

    pub async fn unbind_by_user_str(&self, user_str: &str) -> Result<Value, StewardError> {
        self.app
            .post("/wxa/unbind_tester", &json!({ "userstr": user_str }))
            .await
    }
}

/// Temporary-media upload on behalf of the authorizer.
pub struct MediaApi<'a> {
    app: &'a SubApplication,
}

impl MediaApi<'_> {
    /// Forward a staged file to the temporary-media API (multipart field
    /// `media`). The remote response is returned unchanged.
    pub async fn upload_temporary(
        &self,
        media_type: MediaType,
        path: &Path,
    ) -> Result<Value, StewardError> {
        let token = self.app.access_token().await?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(guess_mime(&file_name))?;
        let form = reqwest::multipart::Form::new().part("media", part);

        let mut url = self
            .app
            .client
            .base_url()
            .join("/cgi-bin/media/upload")
            .map_err(|e| StewardError::InvalidParameter(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("access_token", &token)
            .append_pair("type", media_type.as_str());

        let resp = self.app.client.http().post(url).multipart(form).send().await?;
        Ok(resp.json::<Value>().await?)
    }
}

/// Mini-program QR code generation.
pub struct AppCodeApi<'a> {
    app: &'a SubApplication,
}

/// QR endpoints answer with image bytes on success and JSON on failure.
#[derive(Debug, Clone)]
pub enum AppCodeResponse {
    Image { content_type: String, bytes: Vec<u8> },
    Remote(Value),
}

fn starts_like_json(bytes: &[u8]) -> bool {
    let s = std::str::from_utf8(bytes).unwrap_or("");
    let t = s.trim_start();
    t.starts_with('{') || t.starts_with('[')
}

impl AppCodeApi<'_> {
    async fn post_binary(&self, path: &str, body: &Value) -> Result<AppCodeResponse, StewardError> {
        let token = self.app.access_token().await?;
        let mut url = self
            .app
            .client
            .base_url()
            .join(path)
            .map_err(|e| StewardError::InvalidParameter(format!("bad endpoint {path}: {e}")))?;
        url.query_pairs_mut().append_pair("access_token", &token);

        let resp = self.app.client.http().post(url).json(body).send().await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes().await?;

        let is_json = content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or_else(|| starts_like_json(&bytes));
        if is_json {
            Ok(AppCodeResponse::Remote(serde_json::from_slice(&bytes)?))
        } else {
            Ok(AppCodeResponse::Image {
                content_type: content_type.unwrap_or_else(|| "image/jpeg".to_string()),
                bytes: bytes.to_vec(),
            })
        }
    }

    pub async fn get(&self, path: &str, params: &Value) -> Result<AppCodeResponse, StewardError> {
        let mut body = params.as_object().cloned().unwrap_or_default();
        body.insert("path".to_string(), json!(path));
        self.post_binary("/wxa/getwxacode", &Value::Object(body)).await
    }

    pub async fn get_unlimited(
        &self,
        scene: &str,
        params: &Value,
    ) -> Result<AppCodeResponse, StewardError> {
        let mut body = params.as_object().cloned().unwrap_or_default();
        body.insert("scene".to_string(), json!(scene));
        self.post_binary("/wxa/getwxacodeunlimit", &Value::Object(body))
            .await
    }
}

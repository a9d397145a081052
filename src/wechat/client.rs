//! Component-level WeChat Open Platform client.
//!
//! Control-flow responses (token exchanges) are decoded into typed structs;
//! passthrough calls return the remote JSON unchanged so callers see the
//! errcode/errmsg pairs WeChat reports. Tokens are cached in-process with
//! a safety margin subtracted from the upstream `expires_in`.

use crate::cache::TokenCache;
use crate::entities::open_platform;
use crate::errors::StewardError;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.weixin.qq.com";
const COMPONENT_LOGIN_PAGE: &str = "https://mp.weixin.qq.com/cgi-bin/componentloginpage";

/// Seconds subtracted from upstream `expires_in` before caching, so a token
/// is refreshed before WeChat actually rejects it.
const TOKEN_SAFETY_MARGIN_SECS: u64 = 120;

/// Verify tickets are pushed roughly every ten minutes; keep the latest one
/// around long enough to ride out missed pushes.
const VERIFY_TICKET_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Clone, Debug, Deserialize)]
pub struct WxError {
    pub errcode: i64,
    pub errmsg: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ComponentToken {
    component_access_token: String,
    expires_in: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ComponentTokenResp {
    Ok(ComponentToken),
    Err(WxError),
}

#[derive(Clone, Debug, Deserialize)]
struct AuthorizerToken {
    authorizer_access_token: String,
    expires_in: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum AuthorizerTokenResp {
    Ok(AuthorizerToken),
    Err(WxError),
}

#[derive(Clone, Debug, Deserialize)]
struct PreAuthCode {
    pre_auth_code: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum PreAuthCodeResp {
    Ok(PreAuthCode),
    Err(WxError),
}

#[derive(Clone)]
pub struct ComponentClient {
    http: reqwest::Client,
    base_url: Url,
    cache: TokenCache,
}

impl ComponentClient {
    pub fn new(cache: TokenCache) -> Self {
        Self::with_base_url(cache, DEFAULT_BASE_URL).expect("default base url must parse")
    }

    /// Point the client at a different API host (used by tests).
    pub fn with_base_url(cache: TokenCache, base_url: &str) -> Result<Self, StewardError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StewardError::InvalidParameter(format!("bad base url: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            cache,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StewardError> {
        self.base_url
            .join(path)
            .map_err(|e| StewardError::InvalidParameter(format!("bad endpoint {path}: {e}")))
    }

    async fn post_json(
        &self,
        path: &str,
        token: Option<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, StewardError> {
        let mut url = self.endpoint(path)?;
        if let Some((param, value)) = token {
            url.query_pairs_mut().append_pair(param, value);
        }
        debug!(path, "open platform api call");
        let resp = self.http.post(url).json(body).send().await?;
        let value = resp.json::<Value>().await?;
        Ok(value)
    }

    /// Record the latest `component_verify_ticket` WeChat pushed for this
    /// platform. The component token exchange reads it back.
    pub fn store_verify_ticket(&self, component_app_id: &str, ticket: &str) {
        self.cache.set(
            &format!("verify-ticket:{component_app_id}"),
            ticket,
            VERIFY_TICKET_TTL,
        );
    }

    /// Component access token for a platform, cached until shortly before
    /// the upstream expiry.
    pub async fn component_access_token(
        &self,
        platform: &open_platform::Model,
    ) -> Result<String, StewardError> {
        let cache_key = format!("component-token:{}", platform.app_id);
        if let Some(token) = self.cache.get(&cache_key) {
            return Ok(token);
        }

        let ticket_key = format!("verify-ticket:{}", platform.app_id);
        let ticket = self.cache.get(&ticket_key).ok_or_else(|| {
            StewardError::Unavailable(format!(
                "no component_verify_ticket received for {} yet",
                platform.app_id
            ))
        })?;

        let body = json!({
            "component_appid": platform.app_id,
            "component_appsecret": platform.app_secret,
            "component_verify_ticket": ticket,
        });
        let value = self
            .post_json("/cgi-bin/component/api_component_token", None, &body)
            .await?;

        match serde_json::from_value::<ComponentTokenResp>(value)? {
            ComponentTokenResp::Ok(token) => {
                let ttl = token.expires_in.saturating_sub(TOKEN_SAFETY_MARGIN_SECS).max(1);
                self.cache
                    .set(&cache_key, &token.component_access_token, Duration::from_secs(ttl));
                Ok(token.component_access_token)
            }
            ComponentTokenResp::Err(err) => Err(StewardError::remote(err.errcode, err.errmsg)),
        }
    }

    /// Query authorization info for one authorized sub-account. The raw
    /// response is returned; the resolver decides what it means.
    pub async fn query_authorizer(
        &self,
        platform: &open_platform::Model,
        authorizer_app_id: &str,
    ) -> Result<Value, StewardError> {
        let token = self.component_access_token(platform).await?;
        let body = json!({
            "component_appid": platform.app_id,
            "authorizer_appid": authorizer_app_id,
        });
        self.post_json(
            "/cgi-bin/component/api_get_authorizer_info",
            Some(("component_access_token", &token)),
            &body,
        )
        .await
    }

    /// Exchange the auth code from the bind callback for authorization info.
    pub async fn query_auth(
        &self,
        platform: &open_platform::Model,
        auth_code: &str,
    ) -> Result<Value, StewardError> {
        let token = self.component_access_token(platform).await?;
        let body = json!({
            "component_appid": platform.app_id,
            "authorization_code": auth_code,
        });
        self.post_json(
            "/cgi-bin/component/api_query_auth",
            Some(("component_access_token", &token)),
            &body,
        )
        .await
    }

    /// Short-lived access token for acting on behalf of one authorizer,
    /// exchanged from its refresh token and cached per (platform, app).
    pub async fn authorizer_access_token(
        &self,
        platform: &open_platform::Model,
        authorizer_app_id: &str,
        refresh_token: &str,
    ) -> Result<String, StewardError> {
        let cache_key = format!("authorizer-token:{}:{}", platform.app_id, authorizer_app_id);
        if let Some(token) = self.cache.get(&cache_key) {
            return Ok(token);
        }

        let token = self.component_access_token(platform).await?;
        let body = json!({
            "component_appid": platform.app_id,
            "authorizer_appid": authorizer_app_id,
            "authorizer_refresh_token": refresh_token,
        });
        let value = self
            .post_json(
                "/cgi-bin/component/api_authorizer_token",
                Some(("component_access_token", &token)),
                &body,
            )
            .await?;

        match serde_json::from_value::<AuthorizerTokenResp>(value)? {
            AuthorizerTokenResp::Ok(token) => {
                let ttl = token.expires_in.saturating_sub(TOKEN_SAFETY_MARGIN_SECS).max(1);
                self.cache
                    .set(&cache_key, &token.authorizer_access_token, Duration::from_secs(ttl));
                Ok(token.authorizer_access_token)
            }
            AuthorizerTokenResp::Err(err) => Err(StewardError::remote(err.errcode, err.errmsg)),
        }
    }

    /// URL the operator opens to authorize a new sub-account onto this
    /// platform.
    pub async fn pre_authorization_url(
        &self,
        platform: &open_platform::Model,
        redirect_uri: &str,
    ) -> Result<String, StewardError> {
        let token = self.component_access_token(platform).await?;
        let body = json!({ "component_appid": platform.app_id });
        let value = self
            .post_json(
                "/cgi-bin/component/api_create_preauthcode",
                Some(("component_access_token", &token)),
                &body,
            )
            .await?;

        match serde_json::from_value::<PreAuthCodeResp>(value)? {
            PreAuthCodeResp::Ok(code) => Ok(componentloginpage_url(
                &platform.app_id,
                &code.pre_auth_code,
                redirect_uri,
            )),
            PreAuthCodeResp::Err(err) => Err(StewardError::remote(err.errcode, err.errmsg)),
        }
    }

    /// Download the web-domain confirmation file (passthrough).
    pub async fn domain_confirm_file(
        &self,
        platform: &open_platform::Model,
    ) -> Result<Value, StewardError> {
        let token = self.component_access_token(platform).await?;
        self.post_json(
            "/cgi-bin/component/get_domain_confirmfile",
            Some(("component_access_token", &token)),
            &json!({}),
        )
        .await
    }

    /// Look up the details behind a rid from an API error (passthrough).
    pub async fn rid_info(
        &self,
        platform: &open_platform::Model,
        rid: &str,
    ) -> Result<Value, StewardError> {
        let token = self.component_access_token(platform).await?;
        self.post_json(
            "/cgi-bin/openapi/rid/get",
            Some(("component_access_token", &token)),
            &json!({ "rid": rid }),
        )
        .await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Compose the operator-facing authorization page URL.
fn componentloginpage_url(component_app_id: &str, pre_auth_code: &str, redirect_uri: &str) -> String {
    let mut url = Url::parse(COMPONENT_LOGIN_PAGE).expect("login page url must parse");
    url.query_pairs_mut()
        .append_pair("component_appid", component_app_id)
        .append_pair("pre_auth_code", pre_auth_code)
        .append_pair("redirect_uri", redirect_uri);
    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_componentloginpage_url_encodes_redirect() {
        let url = componentloginpage_url("wx-comp", "pre-123", "https://admin.example.com/bind?x=1");
        assert!(url.starts_with("https://mp.weixin.qq.com/cgi-bin/componentloginpage?"));
        assert!(url.contains("component_appid=wx-comp"));
        assert!(url.contains("pre_auth_code=pre-123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fadmin.example.com%2Fbind%3Fx%3D1"));
    }

    #[test]
    fn test_component_token_resp_decodes_both_arms() {
        let ok: ComponentTokenResp = serde_json::from_value(json!({
            "component_access_token": "tok", "expires_in": 7200
        }))
        .unwrap();
        assert!(matches!(ok, ComponentTokenResp::Ok(t) if t.component_access_token == "tok"));

        let err: ComponentTokenResp = serde_json::from_value(json!({
            "errcode": 61004, "errmsg": "access clientip is not registered"
        }))
        .unwrap();
        assert!(matches!(err, ComponentTokenResp::Err(e) if e.errcode == 61004));
    }
}

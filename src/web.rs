//! HTTP surface: platform credential administration, Open Platform
//! passthroughs, per-sub-account operations, and the anonymous token-gated
//! media route.
//!
//! Every platform-scoped handler resolves the open-platform row from the
//! `{slug}` path segment explicitly; there is no request-ambient platform
//! state.

use crate::cache::{random_token, TokenCache};
use crate::errors::StewardError;
use crate::media::{guess_mime, MediaStore, MediaType};
use crate::settings::Settings;
use crate::storage;
use crate::wechat::authorizer::{AppCodeResponse, NicknameRequest};
use crate::wechat::{resolve, ComponentClient};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
    pub wechat: ComponentClient,
    pub media: MediaStore,
    pub tokens: TokenCache,
}

impl IntoResponse for StewardError {
    fn into_response(self) -> Response {
        let status = match &self {
            StewardError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            StewardError::NotFound(_) => StatusCode::NOT_FOUND,
            StewardError::Forbidden(_) => StatusCode::FORBIDDEN,
            StewardError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StewardError::RemoteApi { .. } | StewardError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/platforms", get(list_platforms).post(create_platform))
        .route(
            "/platforms/{slug}",
            get(show_platform).put(update_platform).delete(delete_platform),
        )
        .route("/platforms/{slug}/ticket", post(receive_ticket))
        .route("/platforms/{slug}/domain-confirm-file", get(domain_confirm_file))
        .route("/platforms/{slug}/rid", post(rid_info))
        .route("/platforms/{slug}/bind", get(bind_page))
        .route("/platforms/{slug}/bind/callback", get(bind_callback))
        .route("/platforms/{slug}/apps/{app_id}/notify", post(authorizer_notify))
        .route("/platforms/{slug}/apps/{app_id}/basic-info", get(basic_info))
        .route(
            "/platforms/{slug}/apps/{app_id}/media/local",
            get(list_local_media)
                .post(upload_local_media)
                .delete(delete_local_media),
        )
        .route(
            "/platforms/{slug}/apps/{app_id}/media/temporary",
            post(upload_temporary_media),
        )
        .route("/platforms/{slug}/apps/{app_id}/nickname", post(set_nickname))
        .route(
            "/platforms/{slug}/apps/{app_id}/nickname/check",
            post(check_nickname),
        )
        .route(
            "/platforms/{slug}/apps/{app_id}/nickname/audit",
            get(nickname_audit_status),
        )
        .route("/platforms/{slug}/apps/{app_id}/avatar", post(set_avatar))
        .route("/platforms/{slug}/apps/{app_id}/signature", post(set_signature))
        .route(
            "/platforms/{slug}/apps/{app_id}/testers",
            get(list_testers).post(bind_tester),
        )
        .route(
            "/platforms/{slug}/apps/{app_id}/testers/{user_slug}",
            axum::routing::delete(unbind_tester),
        )
        .route("/platforms/{slug}/apps/{app_id}/app-code", post(app_code))
        .route("/media/{app_id}/{media_type}/{file_name}", get(serve_media))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> miette::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    )
    .parse()
    .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let app = router(state);

    tracing::info!(%addr, "API listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| miette::miette!("bind failed: {e}"))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| miette::miette!("server failed: {e}"))?;
    Ok(())
}

async fn load_platform(
    state: &AppState,
    slug: &str,
) -> Result<crate::entities::open_platform::Model, StewardError> {
    storage::get_open_platform(&state.db, slug)
        .await?
        .ok_or_else(|| StewardError::NotFound(format!("no open platform named {slug}")))
}

fn remote_call_succeeded(response: &Value) -> bool {
    response.get("errcode").and_then(Value::as_i64) == Some(0)
}

// ---------------------------------------------------------------------------
// Platform credential administration

async fn list_platforms(State(state): State<AppState>) -> Result<Response, StewardError> {
    let platforms = storage::list_open_platforms(&state.db).await?;
    // Secrets stay inside the admin plane, but there is no reason to echo
    // them on every listing
    let rows: Vec<Value> = platforms
        .iter()
        .map(|p| {
            json!({
                "slug": p.slug,
                "app_id": p.app_id,
                "name": p.name,
                "created_at": p.created_at,
                "updated_at": p.updated_at,
            })
        })
        .collect();
    Ok(Json(rows).into_response())
}

async fn create_platform(
    State(state): State<AppState>,
    Json(input): Json<storage::NewOpenPlatform>,
) -> Result<Response, StewardError> {
    if input.slug.is_empty() || input.app_id.is_empty() {
        return Err(StewardError::InvalidParameter(
            "slug and app_id are required".to_string(),
        ));
    }
    if input.slug.contains('/') {
        return Err(StewardError::InvalidParameter(
            "slug must be a single path segment".to_string(),
        ));
    }
    let platform = storage::create_open_platform(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(platform)).into_response())
}

/// Core parameters the operator pastes into the WeChat console, plus a live
/// component token attempt with the failure captured instead of raised.
async fn show_platform(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let base = state.settings.public_url();

    let (access_token, err_msg) = match state.wechat.component_access_token(&platform).await {
        Ok(token) => (Some(token), None),
        Err(err) => {
            tracing::error!(error = %err, slug, "component token lookup failed");
            (None, Some(err.to_string()))
        }
    };

    Ok(Json(json!({
        "name": platform.name,
        "app_id": platform.app_id,
        "verify_token": platform.verify_token,
        "aes_key": platform.aes_key,
        "domain": base,
        "serve_url": format!("{base}/platforms/{slug}/ticket"),
        "notify_url": format!("{base}/platforms/{slug}/apps/$APPID$/notify"),
        "bind_url": format!("{base}/platforms/{slug}/bind"),
        "access_token": access_token,
        "err_msg": err_msg,
    }))
    .into_response())
}

async fn update_platform(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(update): Json<storage::OpenPlatformUpdate>,
) -> Result<Response, StewardError> {
    let updated = storage::update_open_platform(&state.db, &slug, update)
        .await?
        .ok_or_else(|| StewardError::NotFound(format!("no open platform named {slug}")))?;
    Ok(Json(updated).into_response())
}

async fn delete_platform(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, StewardError> {
    if !storage::delete_open_platform(&state.db, &slug).await? {
        return Err(StewardError::NotFound(format!(
            "no open platform named {slug}"
        )));
    }
    Ok(Json(json!({ "success": true })).into_response())
}

// ---------------------------------------------------------------------------
// Open Platform passthroughs

#[derive(Debug, Deserialize)]
struct TicketPush {
    ticket: String,
}

/// Intake for the periodic `component_verify_ticket` push. WeChat expects
/// the literal body "success" as the ack.
async fn receive_ticket(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(push): Json<TicketPush>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    state.wechat.store_verify_ticket(&platform.app_id, &push.ticket);
    Ok("success".into_response())
}

/// Message pushes for individual authorizers are acked and otherwise
/// ignored; this backend does not consume them.
async fn authorizer_notify(
    State(state): State<AppState>,
    Path((slug, _app_id)): Path<(String, String)>,
) -> Result<Response, StewardError> {
    load_platform(&state, &slug).await?;
    Ok("success".into_response())
}

async fn domain_confirm_file(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let result = state.wechat.domain_confirm_file(&platform).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct RidQuery {
    rid: String,
}

async fn rid_info(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(query): Json<RidQuery>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let result = state.wechat.rid_info(&platform, &query.rid).await?;
    Ok(Json(result).into_response())
}

async fn bind_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let redirect = format!(
        "{}/platforms/{}/bind/callback",
        state.settings.public_url(),
        slug
    );
    let auth_url = state.wechat.pre_authorization_url(&platform, &redirect).await?;
    Ok(Json(json!({ "auth_url": auth_url })).into_response())
}

#[derive(Debug, Deserialize)]
struct BindCallbackQuery {
    auth_code: String,
}

async fn bind_callback(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<BindCallbackQuery>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let result = state.wechat.query_auth(&platform, &query.auth_code).await?;
    Ok(Json(result).into_response())
}

// ---------------------------------------------------------------------------
// Sub-application passthroughs

async fn basic_info(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let result = app.account().basic_info().await?;
    Ok(Json(result).into_response())
}

// ---------------------------------------------------------------------------
// Media staging

async fn upload_local_media(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Response, StewardError> {
    load_platform(&state, &slug).await?;

    let mut declared_type: Option<String> = None;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StewardError::InvalidParameter(format!("bad multipart body: {e}")))?
    {
        if field.name() == Some("type") {
            declared_type = Some(
                field
                    .text()
                    .await
                    .map_err(|e| StewardError::InvalidParameter(format!("bad type field: {e}")))?,
            );
        } else if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| StewardError::InvalidParameter(format!("bad file field: {e}")))?;
            files.push((file_name, bytes.to_vec()));
        }
    }

    // Type is validated before any file touches the disk
    let media_type: MediaType = declared_type
        .ok_or_else(|| StewardError::InvalidParameter("missing media type".to_string()))?
        .parse()?;

    let mut count = 0usize;
    for (file_name, bytes) in &files {
        if state.media.store(&app_id, media_type, file_name, bytes).await {
            count += 1;
        }
    }
    if count == 0 {
        return Err(StewardError::Unavailable("no file could be stored".to_string()));
    }
    Ok(Json(json!({ "success": count })).into_response())
}

#[derive(Debug, Deserialize)]
struct DeleteMediaRequest {
    file_names: Vec<String>,
    #[serde(rename = "type")]
    media_type: String,
}

async fn delete_local_media(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<DeleteMediaRequest>,
) -> Result<Response, StewardError> {
    load_platform(&state, &slug).await?;
    let media_type: MediaType = request.media_type.parse()?;
    let result = state
        .media
        .delete(&app_id, media_type, &request.file_names)
        .await;
    Ok(Json(json!({ "success": result })).into_response())
}

#[derive(Debug, Deserialize)]
struct ListMediaQuery {
    #[serde(rename = "type")]
    media_type: Option<String>,
}

/// Grouped listing with a shared, time-limited access token appended to
/// every URL. The token is minted at most once per request batch.
async fn list_local_media(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Query(query): Query<ListMediaQuery>,
) -> Result<Response, StewardError> {
    load_platform(&state, &slug).await?;
    let filter = match query.media_type {
        Some(raw) => Some(raw.parse::<MediaType>()?),
        None => None,
    };

    let files = state.media.list(&app_id, filter).await?;

    let key = format!("{}{}", state.settings.media.token_cache_prefix, app_id);
    let ttl = Duration::from_secs(state.settings.media.token_ttl_minutes * 60);
    let token = state.tokens.get_or_insert_with(&key, ttl, random_token);

    let base = state.settings.public_url();
    let mut grouped = serde_json::Map::new();
    for media_type in MediaType::ALL {
        grouped.insert(media_type.as_str().to_string(), json!([]));
    }
    for path in &files {
        // The last two segments are <type>/<file_name> by construction
        let mut tail = path.iter().rev().filter_map(|s| s.to_str());
        let (Some(name), Some(type_str)) = (tail.next(), tail.next()) else {
            continue;
        };
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| StewardError::Other(format!("bad public url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StewardError::Other("public url cannot be a base".to_string()))?
            .extend(["media", app_id.as_str(), type_str, name]);
        url.query_pairs_mut().append_pair("token", &token);

        if let Some(group) = grouped.get_mut(type_str).and_then(Value::as_array_mut) {
            group.push(json!({ "name": name, "url": String::from(url) }));
        }
    }
    Ok(Json(Value::Object(grouped)).into_response())
}

#[derive(Debug, Deserialize)]
struct TemporaryMediaRequest {
    file_name: String,
    #[serde(rename = "type")]
    media_type: String,
}

async fn upload_temporary_media(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<TemporaryMediaRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let media_type: MediaType = request.media_type.parse()?;
    let path = state
        .media
        .path_of(&app_id, media_type, &request.file_name)
        .await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let result = app.media().upload_temporary(media_type, &path).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct ServeMediaQuery {
    token: Option<String>,
}

/// Anonymous staged-file route, gated by the cached per-app token.
async fn serve_media(
    State(state): State<AppState>,
    Path((app_id, media_type, file_name)): Path<(String, String, String)>,
    Query(query): Query<ServeMediaQuery>,
) -> Result<Response, StewardError> {
    let key = format!("{}{}", state.settings.media.token_cache_prefix, app_id);
    let expected = state
        .tokens
        .get(&key)
        .ok_or_else(|| StewardError::Forbidden("no active media token".to_string()))?;
    if query.token.as_deref() != Some(expected.as_str()) {
        return Err(StewardError::Forbidden("bad media token".to_string()));
    }

    let media_type: MediaType = media_type.parse()?;
    let path = state.media.path_of(&app_id, media_type, &file_name).await?;
    let bytes = tokio::fs::read(&path).await?;
    Ok((
        [(header::CONTENT_TYPE, guess_mime(&file_name))],
        bytes,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Nickname, avatar, signature

#[derive(Debug, Deserialize)]
struct CheckNicknameRequest {
    nick_name: String,
}

async fn check_nickname(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<CheckNicknameRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let result = app.setting().is_available_nickname(&request.nick_name).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct NicknameAuditQuery {
    audit_id: String,
}

async fn nickname_audit_status(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Query(query): Query<NicknameAuditQuery>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let result = app.setting().nickname_audit_status(&query.audit_id).await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct SetNicknameRequest {
    nick_name: String,
    id_card: Option<String>,
    license: Option<String>,
    naming_other_stuff_1: Option<String>,
    naming_other_stuff_2: Option<String>,
    naming_other_stuff_3: Option<String>,
    naming_other_stuff_4: Option<String>,
    naming_other_stuff_5: Option<String>,
}

async fn set_nickname(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<SetNicknameRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;

    let other_stuffs = [
        request.naming_other_stuff_1,
        request.naming_other_stuff_2,
        request.naming_other_stuff_3,
        request.naming_other_stuff_4,
        request.naming_other_stuff_5,
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect();

    let result = app
        .setting()
        .set_nickname(&NicknameRequest {
            nick_name: request.nick_name,
            id_card: request.id_card,
            license: request.license,
            other_stuffs,
        })
        .await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct SetAvatarRequest {
    head_img_media_id: String,
    x1: Option<f64>,
    y1: Option<f64>,
    x2: Option<f64>,
    y2: Option<f64>,
}

async fn set_avatar(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<SetAvatarRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let crop = match (request.x1, request.y1, request.x2, request.y2) {
        (Some(x1), Some(y1), Some(x2), Some(y2)) => Some((x1, y1, x2, y2)),
        _ => None,
    };
    let result = app
        .account()
        .update_avatar(&request.head_img_media_id, crop)
        .await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct SetSignatureRequest {
    signature: String,
}

async fn set_signature(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<SetSignatureRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;
    let result = app.account().update_signature(&request.signature).await?;
    Ok(Json(result).into_response())
}

// ---------------------------------------------------------------------------
// Testers

/// Remote list is the source of truth; local rows only contribute the
/// wechat id remembered from the original bind.
async fn list_testers(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;

    let result = app.tester().list().await?;
    if !remote_call_succeeded(&result) {
        return Ok(Json(result).into_response());
    }

    let local = storage::testers_for_app(&state.db, &app_id).await?;
    let members = result
        .get("members")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let merged: Vec<Value> = members
        .into_iter()
        .map(|member| {
            let user_str = member
                .get("userstr")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let mut row = serde_json::Map::new();
            row.insert("user_str".to_string(), json!(user_str));
            if let Some(tester) = local.iter().find(|t| t.user_str == user_str) {
                row.insert("wechat_id".to_string(), json!(tester.wechat_id));
            }
            Value::Object(row)
        })
        .collect();
    Ok(Json(merged).into_response())
}

#[derive(Debug, Deserialize)]
struct BindTesterRequest {
    wechat_id: String,
}

async fn bind_tester(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<BindTesterRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;

    let result = app.tester().bind(&request.wechat_id).await?;
    if remote_call_succeeded(&result) {
        let user_str = result
            .get("userstr")
            .and_then(Value::as_str)
            .unwrap_or_default();
        storage::record_tester_bound(&state.db, &app_id, &request.wechat_id, user_str).await?;
    }
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct UnbindTesterQuery {
    #[serde(default)]
    use_wechat_id: bool,
}

async fn unbind_tester(
    State(state): State<AppState>,
    Path((slug, app_id, user_slug)): Path<(String, String, String)>,
    Query(query): Query<UnbindTesterQuery>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;

    let result = if query.use_wechat_id {
        let result = app.tester().unbind_by_wechat_id(&user_slug).await?;
        if remote_call_succeeded(&result) {
            storage::remove_tester_by_wechat_id(&state.db, &app_id, &user_slug).await?;
        }
        result
    } else {
        let result = app.tester().unbind_by_user_str(&user_slug).await?;
        if remote_call_succeeded(&result) {
            storage::remove_tester_by_user_str(&state.db, &app_id, &user_slug).await?;
        }
        result
    };
    Ok(Json(result).into_response())
}

// ---------------------------------------------------------------------------
// QR codes

#[derive(Debug, Deserialize)]
struct AppCodeRequest {
    path: Option<String>,
    scene: Option<String>,
    width: Option<u32>,
    auto_color: Option<bool>,
    line_color: Option<Value>,
    is_hyaline: Option<bool>,
    #[serde(default)]
    unlimited: bool,
}

async fn app_code(
    State(state): State<AppState>,
    Path((slug, app_id)): Path<(String, String)>,
    Json(request): Json<AppCodeRequest>,
) -> Result<Response, StewardError> {
    let platform = load_platform(&state, &slug).await?;
    let app = resolve(&state.wechat, &platform, &app_id).await?;

    let mut params = serde_json::Map::new();
    if let Some(width) = request.width {
        params.insert("width".to_string(), json!(width));
    }
    if let Some(auto_color) = request.auto_color {
        params.insert("auto_color".to_string(), json!(auto_color));
    }
    if let Some(line_color) = request.line_color {
        params.insert("line_color".to_string(), line_color);
    }
    if let Some(is_hyaline) = request.is_hyaline {
        params.insert("is_hyaline".to_string(), json!(is_hyaline));
    }
    let params = Value::Object(params);

    let response = if request.unlimited {
        let scene = request.scene.ok_or_else(|| {
            StewardError::InvalidParameter("scene is required for unlimited codes".to_string())
        })?;
        app.app_code().get_unlimited(&scene, &params).await?
    } else {
        let path = request.path.ok_or_else(|| {
            StewardError::InvalidParameter("path is required for limited codes".to_string())
        })?;
        app.app_code().get(&path, &params).await?
    };

    Ok(match response {
        AppCodeResponse::Image { content_type, bytes } => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        AppCodeResponse::Remote(value) => Json(value).into_response(),
    })
}

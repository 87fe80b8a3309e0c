//! JSON API behind the admin panel.
//!
//! Every response uses the same envelope: `{"success": true, ...}` on success
//! and `{"success": false, "error": "..."}` with a matching status otherwise.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use poise::serenity_prelude::GuildId;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::logs::{logs_recent, logs_stream};
use crate::bridge::GatewayBridge;
use crate::config::snowflake::parse_id;
use crate::config::SharedConfigStore;
use crate::error::BotError;
use crate::logging::SharedLogBuffer;
use crate::platform::SharedPlatform;
use crate::publish;

#[derive(Clone)]
pub struct ApiState {
    pub store: SharedConfigStore,
    pub platform: SharedPlatform,
    pub bridge: GatewayBridge,
    pub log_buffer: SharedLogBuffer,
}

pub struct ApiError(pub BotError);

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("API request failed: {}", self.0);
        }
        (
            status,
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/config/:key", get(get_config_key))
        .route("/api/guilds", get(list_guilds))
        .route("/api/guild/:id/roles", get(list_roles))
        .route("/api/guild/:id/channels", get(list_channels))
        .route("/api/guild/:id/emojis", get(list_emojis))
        .route("/api/publish", post(publish))
        .route("/api/logs", get(logs_recent))
        .route("/api/logs/stream", get(logs_stream))
        .with_state(state)
}

async fn health() -> &'static str {
    "Reactgate admin API is running"
}

/// GET /api/config
async fn get_config(State(state): State<ApiState>) -> ApiResult {
    let config = serde_json::to_value(state.store.snapshot()).map_err(BotError::from)?;
    Ok(Json(json!({ "success": true, "config": config })))
}

/// GET /api/config/:key
async fn get_config_key(State(state): State<ApiState>, Path(key): Path<String>) -> ApiResult {
    let value = state
        .store
        .get(&key)
        .ok_or_else(|| BotError::validation(format!("Unknown config key '{}'", key)))?;
    Ok(Json(json!({ "success": true, "key": key, "value": value })))
}

/// POST /api/config - merge a partial document
async fn update_config(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| BotError::validation(e.body_text()))?;
    let Value::Object(partial) = body else {
        return Err(BotError::validation("Expected a JSON object").into());
    };

    let report = state.store.update(partial);
    info!(
        "Configuration updated via API: applied {:?}, ignored {:?}, rejected {:?}",
        report.applied,
        report.ignored,
        report.rejected.keys().collect::<Vec<_>>()
    );

    Ok(Json(json!({
        "success": true,
        "message": "Configuration updated",
        "applied": report.applied,
        "ignored": report.ignored,
        "rejected": report.rejected,
    })))
}

/// GET /api/guilds
async fn list_guilds(State(state): State<ApiState>) -> ApiResult {
    Ok(Json(json!({ "success": true, "guilds": state.platform.guilds() })))
}

fn guild_param(raw: &str) -> Result<GuildId, ApiError> {
    parse_id(raw)
        .map(GuildId::new)
        .ok_or_else(|| BotError::validation("Invalid guild id").into())
}

fn not_found(guild_id: GuildId) -> ApiError {
    BotError::GuildNotFound {
        id: guild_id.to_string(),
    }
    .into()
}

/// GET /api/guild/:id/roles
async fn list_roles(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let guild_id = guild_param(&id)?;
    let roles = state.platform.roles(guild_id).ok_or_else(|| not_found(guild_id))?;
    Ok(Json(json!({ "success": true, "roles": roles })))
}

/// GET /api/guild/:id/channels
async fn list_channels(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let guild_id = guild_param(&id)?;
    let channels = state
        .platform
        .text_channels(guild_id)
        .ok_or_else(|| not_found(guild_id))?;
    Ok(Json(json!({ "success": true, "channels": channels })))
}

/// GET /api/guild/:id/emojis
async fn list_emojis(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let guild_id = guild_param(&id)?;
    let emojis = state.platform.emojis(guild_id).ok_or_else(|| not_found(guild_id))?;
    Ok(Json(json!({ "success": true, "emojis": emojis })))
}

/// The guild id of a publish request, as a string or a number.
fn publish_target(body: &Value) -> Result<GuildId, BotError> {
    let id = match body.get("guild_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => {
            Some(parse_id(s).ok_or_else(|| BotError::validation("Invalid guild id"))?)
        }
        Some(Value::Number(n)) => Some(
            n.as_u64()
                .filter(|id| *id != 0)
                .ok_or_else(|| BotError::validation("Invalid guild id"))?,
        ),
        Some(_) => return Err(BotError::validation("Invalid guild id")),
    };
    id.map(GuildId::new)
        .ok_or_else(|| BotError::validation("Guild id is required"))
}

/// POST /api/publish
async fn publish(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body.map_err(|e| BotError::validation(e.body_text()))?;
    let guild_id = publish_target(&body)?;

    // Reject what the gateway would reject anyway, without queueing.
    publish::validate(state.platform.as_ref(), &state.store.snapshot(), guild_id)?;

    match state.bridge.publish(guild_id).await {
        Ok(receipt) => Ok(Json(json!({
            "success": true,
            "message": "Verification message published",
            "message_id": receipt.message_id.to_string(),
            "channel_id": receipt.channel_id.to_string(),
            "emoji": receipt.emoji,
        }))),
        Err(e) => {
            warn!("Publish for guild {} failed: {}", guild_id, e);
            Err(e.into())
        }
    }
}

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::channel::GuildSummary;
use crate::state::AppState;

fn require_ready(state: &AppState) -> Result<(), AppError> {
    if state.tracker.is_ready() {
        Ok(())
    } else {
        Err(AppError::NotReady {
            cause: state.tracker.blocking_cause(),
        })
    }
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    require_ready(&state)?;
    let snapshot = state.gateway.snapshot().await;
    Ok(Json(json!({
        "guilds": snapshot.guilds,
        "channels": snapshot.channels,
        "users": snapshot.users,
        "ping_ms": snapshot.ping_ms,
        "uptime": state.uptime_secs(),
        "sessions_established": state.tracker.sessions_established(),
    })))
}

pub async fn guild(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<GuildSummary>, AppError> {
    require_ready(&state)?;
    let guild = state
        .gateway
        .guild(&guild_id)
        .await?
        .ok_or_else(|| AppError::NotFound("guild not found or bot is not a member".to_string()))?;
    Ok(Json(guild))
}

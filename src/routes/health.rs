use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Discord Bot API",
        "endpoints": {
            "send_message": "POST /sendmessage",
            "send_message_legacy": "POST /api/sendmessage",
            "health": "GET /health",
            "stats": "GET /api/stats",
            "guild": "GET /api/guild/{guild_id}",
            "debug": "GET /api/debug",
        }
    }))
}

/// Always 200; readiness is reported in the body.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let ready = state.tracker.is_ready();
    let bot = if ready {
        let snapshot = state.gateway.snapshot().await;
        json!({
            "username": snapshot.username,
            "guilds": snapshot.guilds,
            "ping_ms": snapshot.ping_ms,
        })
    } else {
        Value::Null
    };

    let status = if ready { "healthy" } else { "starting" };
    Json(json!({
        "status": status,
        "bot_ready": ready,
        "session": state.tracker.state(),
        "login_error": state.tracker.blocking_cause(),
        "uptime": state.uptime_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "bot": bot,
    }))
}

pub async fn debug(State(state): State<AppState>) -> Json<Value> {
    let tracker = &state.tracker;
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": state.uptime_secs(),
        "session": {
            "state": tracker.state(),
            "ready": tracker.is_ready(),
            "login_attempted": tracker.login_attempted(),
            "last_error": tracker.last_error(),
            "sessions_established": tracker.sessions_established(),
            "user": tracker.user_tag(),
        },
        "token": {
            "present": state.token_len > 0,
            "length": state.token_len,
        },
        "rate_limits": {
            "api": state.api_limiter.capacity(),
            "send": state.send_limiter.capacity(),
        },
    }))
}

mod health;
pub mod messages;
mod stats;

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_mw;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::security_headers;
use crate::state::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router. Consumes the state so the rate
/// limiters can be wired up as middleware state.
pub fn router(state: AppState) -> Router {
    let send = Router::new()
        .route("/sendmessage", post(messages::send_message))
        .route("/api/sendmessage", post(messages::send_message))
        .layer(axum_mw::from_fn_with_state(
            state.send_limiter.clone(),
            rate_limit_middleware,
        ));

    let api = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/debug", get(health::debug))
        .route("/api/stats", get(stats::stats))
        .route("/api/guild/{guild_id}", get(stats::guild))
        .merge(send)
        .layer(axum_mw::from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit_middleware,
        ));

    let app = Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .merge(api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    security_headers::apply(app).with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("endpoint not found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

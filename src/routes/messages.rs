use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::models::message::{SendMessage, SendReceipt};
use crate::state::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessage>, JsonRejection>,
) -> Result<Json<SendReceipt>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    tracing::debug!(
        channel_id = ?request.channel_id,
        has_embed = request.embed.is_some(),
        "sendmessage request"
    );

    let receipt = state.dispatcher.dispatch(request).await?;
    Ok(Json(receipt))
}

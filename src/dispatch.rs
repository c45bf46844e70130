use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::gateway::{parse_snowflake, ChatGateway, GatewayError};
use crate::models::embed::Embed;
use crate::models::message::{
    truncate_content, OutgoingMessage, SendMessage, SendReceipt, MAX_CONTENT_CHARS,
};
use crate::readiness::SessionTracker;

/// Forwards validated send requests to the chat gateway.
#[derive(Clone)]
pub struct MessageDispatcher {
    gateway: Arc<dyn ChatGateway>,
    tracker: Arc<SessionTracker>,
    timeout: Duration,
}

impl MessageDispatcher {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        tracker: Arc<SessionTracker>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            tracker,
            timeout,
        }
    }

    pub async fn dispatch(&self, request: SendMessage) -> Result<SendReceipt, AppError> {
        let channel_id = request
            .channel_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::InvalidArgument("channel_id is required".to_string())
            })?;
        let text = request.text().ok_or_else(|| {
            AppError::InvalidArgument(
                "message content is required (content or other)".to_string(),
            )
        })?;
        parse_snowflake(channel_id)?;

        if !self.tracker.is_ready() {
            tracing::debug!(%channel_id, "rejecting send, session not ready");
            return Err(AppError::NotReady {
                cause: self.tracker.blocking_cause(),
            });
        }

        let channel = self
            .bounded("channel lookup", self.gateway.fetch_channel(channel_id))
            .await?
            .ok_or_else(|| AppError::ChannelNotFound(format!("channel {channel_id} not found")))?;

        if !channel.kind.is_text_capable() {
            return Err(AppError::InvalidChannelType(format!(
                "channel {channel_id} is not a text channel"
            )));
        }

        if channel.guild_id.is_some() && channel.can_send == Some(false) {
            return Err(AppError::PermissionDenied(format!(
                "bot lacks permission to send messages in channel {channel_id}"
            )));
        }

        let (content, truncated) = truncate_content(text, MAX_CONTENT_CHARS);
        if truncated {
            tracing::debug!(%channel_id, "content truncated to {MAX_CONTENT_CHARS} characters");
        }
        let outgoing = OutgoingMessage {
            content,
            embed: request.embed.as_ref().map(Embed::from_input),
        };

        let sent = self
            .bounded("send", self.gateway.send_message(&channel.id, &outgoing))
            .await
            .map_err(|e| AppError::DispatchFailed(e.to_string()))?;

        tracing::info!(
            channel_id = %sent.channel_id,
            message_id = %sent.id,
            channel = channel.name.as_deref().unwrap_or(""),
            "message relayed"
        );

        Ok(SendReceipt {
            success: true,
            message_id: sent.id,
            channel_id: sent.channel_id,
            timestamp: sent.timestamp,
            truncated,
        })
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or(Err(GatewayError::Timeout(op)))
    }
}

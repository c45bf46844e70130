//! Chat platform gateway seam.
//!
//! The dispatcher only ever talks to a [`ChatGateway`]. The serenity-backed
//! implementation lives in [`discord`], and [`handler`] turns serenity's
//! event callbacks into [`events::LifecycleEvent`]s for the readiness
//! tracker.

pub mod discord;
pub mod events;
pub mod handler;

use std::fmt;

use async_trait::async_trait;

use crate::models::channel::{GatewaySnapshot, GuildSummary, ResolvedChannel};
use crate::models::message::{OutgoingMessage, SentMessage};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The id is not a well-formed snowflake.
    InvalidId(String),
    /// The platform refused access to the resource.
    Forbidden(String),
    /// The named operation exceeded its deadline.
    Timeout(&'static str),
    Library(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::InvalidId(id) => write!(f, "invalid id: {id}"),
            GatewayError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            GatewayError::Timeout(op) => write!(f, "{op} timed out"),
            GatewayError::Library(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Look up a channel. `Ok(None)` means the platform has no such channel.
    async fn fetch_channel(&self, channel_id: &str)
        -> Result<Option<ResolvedChannel>, GatewayError>;

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, GatewayError>;

    /// Look up a guild the session is a member of.
    async fn guild(&self, guild_id: &str) -> Result<Option<GuildSummary>, GatewayError>;

    async fn snapshot(&self) -> GatewaySnapshot;
}

/// Parse a platform snowflake id.
pub fn parse_snowflake(id: &str) -> Result<u64, GatewayError> {
    id.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n != 0)
        .ok_or_else(|| GatewayError::InvalidId(id.to_string()))
}

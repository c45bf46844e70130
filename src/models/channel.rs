use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
    Thread,
    Direct,
    Category,
    Forum,
    Other,
}

impl ChannelKind {
    /// Whether plain messages can be posted directly into this kind.
    pub fn is_text_capable(self) -> bool {
        matches!(
            self,
            ChannelKind::Text | ChannelKind::Voice | ChannelKind::Thread | ChannelKind::Direct
        )
    }
}

/// A channel looked up through the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChannel {
    pub id: String,
    pub name: Option<String>,
    pub kind: ChannelKind,
    pub guild_id: Option<String>,
    /// The session's send permission, when it could be computed from cache.
    pub can_send: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    pub member_count: u64,
    pub channels: usize,
    pub owner_id: String,
    pub created_at: String,
    pub joined_at: Option<String>,
}

/// Point-in-time view of the gateway session for health and stats.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewaySnapshot {
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub guilds: usize,
    pub channels: usize,
    pub users: usize,
    pub ping_ms: Option<u64>,
}

//! serenity-backed [`ChatGateway`].

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage};
use serenity::cache::Cache;
use serenity::gateway::{GatewayError as ShardError, ShardManager};
use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType, GuildChannel};
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::{Permissions, Timestamp};

use super::{parse_snowflake, ChatGateway, GatewayError};
use crate::models::channel::{ChannelKind, GatewaySnapshot, GuildSummary, ResolvedChannel};
use crate::models::embed::Embed;
use crate::models::message::{OutgoingMessage, SentMessage};

pub struct DiscordGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    shard_manager: Arc<ShardManager>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, shard_manager: Arc<ShardManager>) -> Self {
        Self {
            http,
            cache,
            shard_manager,
        }
    }

    fn send_permission(&self, channel: &GuildChannel) -> Option<bool> {
        let bot_id = self.cache.current_user().id;
        match channel.permissions_for_user(&self.cache, bot_id) {
            Ok(perms) => {
                let send = if channel.thread_metadata.is_some() {
                    Permissions::SEND_MESSAGES_IN_THREADS
                } else {
                    Permissions::SEND_MESSAGES
                };
                Some(perms.contains(Permissions::VIEW_CHANNEL | send))
            }
            Err(e) => {
                tracing::debug!(channel_id = %channel.id, "permissions not computable from cache: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn fetch_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ResolvedChannel>, GatewayError> {
        let id = ChannelId::new(parse_snowflake(channel_id)?);
        let channel = match id.to_channel((&self.cache, self.http.as_ref())).await {
            Ok(channel) => channel,
            Err(e) if http_status(&e) == Some(404) => return Ok(None),
            Err(e) => return Err(classify(e)),
        };

        let resolved = match channel {
            Channel::Guild(gc) => ResolvedChannel {
                id: gc.id.to_string(),
                name: Some(gc.name.clone()),
                kind: channel_kind(gc.kind),
                guild_id: Some(gc.guild_id.to_string()),
                can_send: self.send_permission(&gc),
            },
            Channel::Private(pc) => ResolvedChannel {
                id: pc.id.to_string(),
                name: Some(pc.recipient.name.clone()),
                kind: ChannelKind::Direct,
                guild_id: None,
                can_send: None,
            },
            other => ResolvedChannel {
                id: other.id().to_string(),
                name: None,
                kind: ChannelKind::Other,
                guild_id: None,
                can_send: None,
            },
        };
        Ok(Some(resolved))
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, GatewayError> {
        let id = ChannelId::new(parse_snowflake(channel_id)?);
        let mut builder = CreateMessage::new().content(message.content.clone());
        if let Some(ref embed) = message.embed {
            builder = builder.embed(build_embed(embed));
        }

        let sent = id
            .send_message(self.http.as_ref(), builder)
            .await
            .map_err(classify)?;

        Ok(SentMessage {
            id: sent.id.to_string(),
            channel_id: sent.channel_id.to_string(),
            timestamp: sent.timestamp.to_string(),
        })
    }

    async fn guild(&self, guild_id: &str) -> Result<Option<GuildSummary>, GatewayError> {
        let id = GuildId::new(parse_snowflake(guild_id)?);
        let Some(guild) = self.cache.guild(id) else {
            return Ok(None);
        };
        Ok(Some(GuildSummary {
            id: guild.id.to_string(),
            name: guild.name.clone(),
            member_count: guild.member_count,
            channels: guild.channels.len(),
            owner_id: guild.owner_id.to_string(),
            created_at: guild.id.created_at().to_string(),
            joined_at: Some(guild.joined_at.to_string()),
        }))
    }

    async fn snapshot(&self) -> GatewaySnapshot {
        let ping_ms = {
            let runners = self.shard_manager.runners.lock().await;
            runners
                .values()
                .filter_map(|r| r.latency)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .max()
        };

        let (username, user_id) = {
            let user = self.cache.current_user();
            (user.tag(), user.id.to_string())
        };
        let guild_ids = self.cache.guilds();
        let channels: usize = guild_ids
            .iter()
            .filter_map(|id| self.cache.guild(*id).map(|g| g.channels.len()))
            .sum();

        GatewaySnapshot {
            username: Some(username),
            user_id: Some(user_id),
            guilds: guild_ids.len(),
            channels,
            users: self.cache.user_count(),
            ping_ms,
        }
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text | ChannelType::News => ChannelKind::Text,
        ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            ChannelKind::Thread
        }
        ChannelType::Private => ChannelKind::Direct,
        ChannelType::Category => ChannelKind::Category,
        ChannelType::Forum => ChannelKind::Forum,
        _ => ChannelKind::Other,
    }
}

fn build_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new().color(embed.color);
    if let Some(ref title) = embed.title {
        builder = builder.title(title.clone());
    }
    if let Some(ref description) = embed.description {
        builder = builder.description(description.clone());
    }
    if let Some(ref footer) = embed.footer {
        builder = builder.footer(CreateEmbedFooter::new(footer.clone()));
    }
    if embed.timestamp {
        builder = builder.timestamp(Timestamp::now());
    }
    for field in &embed.fields {
        builder = builder.field(field.name.clone(), field.value.clone(), field.inline);
    }
    builder
}

fn http_status(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(http) => http.status_code().map(|s| s.as_u16()),
        _ => None,
    }
}

fn classify(err: serenity::Error) -> GatewayError {
    match http_status(&err) {
        Some(403) => GatewayError::Forbidden(err.to_string()),
        _ => GatewayError::Library(err.to_string()),
    }
}

/// Turn a `Client::start` failure into an operator-facing message.
pub fn describe_start_error(err: &serenity::Error) -> String {
    match err {
        serenity::Error::Gateway(ShardError::InvalidAuthentication) => {
            "invalid bot token; copy it again from the developer portal".to_string()
        }
        serenity::Error::Gateway(ShardError::DisallowedGatewayIntents) => {
            "disallowed intents; enable MESSAGE CONTENT in the developer portal".to_string()
        }
        other => other.to_string(),
    }
}

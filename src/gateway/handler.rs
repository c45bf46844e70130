//! serenity event handler that forwards session lifecycle changes to the
//! readiness tracker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serenity::all::{
    ActivityData, ConnectionStage, Context, EventHandler, GatewayIntents, GuildId, Message,
    OnlineStatus, Ready, ResumedEvent, ShardManager, ShardStageUpdateEvent,
};
use serenity::prelude::TypeMapKey;
use tracing::{debug, info, warn};

use super::events::{LifecycleEvent, LifecycleSender};

/// Client data slot holding the shard manager, so handlers can read the
/// heartbeat latency of their own shard.
pub struct ShardManagerKey;

impl TypeMapKey for ShardManagerKey {
    type Value = Arc<ShardManager>;
}

pub struct RelayHandler {
    events: LifecycleSender,
    presence_activity: String,
    ping_command: bool,
}

impl RelayHandler {
    pub fn new(events: LifecycleSender, presence_activity: String, ping_command: bool) -> Self {
        Self {
            events,
            presence_activity,
            ping_command,
        }
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    fn emit(&self, event: LifecycleEvent) {
        if self.events.send(event).is_err() {
            debug!("lifecycle receiver dropped");
        }
    }
}

/// Map a shard stage change to a lifecycle event. `Connected` is reported
/// through `ready`/`resume` instead, which carry the session details.
pub fn stage_event(stage: ConnectionStage) -> Option<LifecycleEvent> {
    match stage {
        ConnectionStage::Connected => None,
        ConnectionStage::Disconnected => Some(LifecycleEvent::SessionDropped),
        _ => Some(LifecycleEvent::Connecting),
    }
}

/// Whether `content` is the `!ping` command.
pub fn is_ping(content: &str) -> bool {
    content.trim().eq_ignore_ascii_case("!ping")
}

/// Reply text for `!ping`: time since the message was sent, plus the shard's
/// heartbeat round trip when one has been measured.
pub fn ping_reply(message_ms: i64, gateway: Option<Duration>) -> String {
    let message_ms = message_ms.max(0);
    match gateway {
        Some(latency) => format!(
            "Pong! Latency: {message_ms}ms, API: {}ms",
            latency.as_millis()
        ),
        None => format!("Pong! Latency: {message_ms}ms, API: n/a"),
    }
}

async fn gateway_latency(ctx: &Context) -> Option<Duration> {
    let manager = ctx.data.read().await.get::<ShardManagerKey>().cloned()?;
    let runners = manager.runners.lock().await;
    runners.get(&ctx.shard_id).and_then(|runner| runner.latency)
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        ctx.set_presence(
            Some(ActivityData::playing(self.presence_activity.clone())),
            OnlineStatus::Online,
        );

        self.emit(LifecycleEvent::SessionEstablished {
            user_tag: ready.user.tag(),
            guilds: ready.guilds.len(),
        });
    }

    async fn resume(&self, ctx: Context, _event: ResumedEvent) {
        let user_tag = ctx.cache.current_user().tag();
        let guilds = ctx.cache.guild_count();
        debug!("discord session resumed");
        self.emit(LifecycleEvent::SessionEstablished { user_tag, guilds });
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        debug!(
            shard = %event.shard_id,
            old = ?event.old,
            new = ?event.new,
            "shard stage update"
        );
        if let Some(lifecycle) = stage_event(event.new) {
            self.emit(lifecycle);
        }
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if !self.ping_command || msg.author.bot || !is_ping(&msg.content) {
            return;
        }

        let message_ms = Utc::now().timestamp_millis() - msg.timestamp.unix_timestamp() * 1000;
        let reply = ping_reply(message_ms, gateway_latency(&ctx).await);

        if let Err(e) = msg.reply(&ctx.http, reply).await {
            warn!(error = %e, "failed to reply to ping");
        }
    }
}

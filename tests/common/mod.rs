#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use discord_relay::config::RateLimitConfig;
use discord_relay::gateway::{ChatGateway, GatewayError};
use discord_relay::models::channel::{ChannelKind, GatewaySnapshot, GuildSummary, ResolvedChannel};
use discord_relay::models::message::{OutgoingMessage, SentMessage};
use discord_relay::readiness::SessionTracker;
use discord_relay::routes;
use discord_relay::state::AppState;
use http::{Method, Request};

/// In-memory gateway that records every message it is asked to send.
#[derive(Default)]
pub struct FakeGateway {
    channels: Mutex<HashMap<String, ResolvedChannel>>,
    guilds: Mutex<HashMap<String, GuildSummary>>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    pub fail_sends: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn add_channel(&self, id: &str, kind: ChannelKind, can_send: Option<bool>) {
        self.channels.lock().unwrap().insert(
            id.to_string(),
            ResolvedChannel {
                id: id.to_string(),
                name: Some(format!("channel-{id}")),
                kind,
                guild_id: Some("1".to_string()),
                can_send,
            },
        );
    }

    pub fn add_guild(&self, id: &str, name: &str) {
        self.guilds.lock().unwrap().insert(
            id.to_string(),
            GuildSummary {
                id: id.to_string(),
                name: name.to_string(),
                member_count: 42,
                channels: 3,
                owner_id: "7".to_string(),
                created_at: "2020-01-01T00:00:00Z".to_string(),
                joined_at: None,
            },
        );
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn fetch_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ResolvedChannel>, GatewayError> {
        Ok(self.channels.lock().unwrap().get(channel_id).cloned())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        message: &OutgoingMessage,
    ) -> Result<SentMessage, GatewayError> {
        if let Some(err) = self.fail_sends.lock().unwrap().clone() {
            return Err(GatewayError::Library(err));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((channel_id.to_string(), message.clone()));
        Ok(SentMessage {
            id: format!("10{}", sent.len()),
            channel_id: channel_id.to_string(),
            timestamp: "2026-10-17T12:00:00Z".to_string(),
        })
    }

    async fn guild(&self, guild_id: &str) -> Result<Option<GuildSummary>, GatewayError> {
        Ok(self.guilds.lock().unwrap().get(guild_id).cloned())
    }

    async fn snapshot(&self) -> GatewaySnapshot {
        GatewaySnapshot {
            username: Some("relay#0001".to_string()),
            user_id: Some("5".to_string()),
            guilds: self.guilds.lock().unwrap().len(),
            channels: self.channels.lock().unwrap().len(),
            users: 1,
            ping_ms: Some(40),
        }
    }
}

/// Test server wiring the real router to a [`FakeGateway`].
pub struct TestServer {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub tracker: Arc<SessionTracker>,
}

impl TestServer {
    /// A server whose session has not completed its handshake.
    pub fn new() -> Self {
        Self::with_send_limit(10)
    }

    pub fn with_send_limit(capacity: u32) -> Self {
        let gateway = Arc::new(FakeGateway::default());
        let tracker = Arc::new(SessionTracker::new());
        let state = AppState::new(
            gateway.clone(),
            tracker.clone(),
            Duration::from_secs(2),
            RateLimitConfig {
                capacity: 100,
                window_secs: 900,
            },
            RateLimitConfig {
                capacity,
                window_secs: 60,
            },
            "test-token".len(),
        );
        Self {
            state,
            gateway,
            tracker,
        }
    }

    /// A ready server with text channel "123" in guild "1".
    pub fn ready() -> Self {
        let server = Self::new();
        server.tracker.on_session_established();
        server
            .gateway
            .add_channel("123", ChannelKind::Text, Some(true));
        server
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

use tokio::sync::mpsc;

/// Session lifecycle events reported by the gateway client.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Login has been handed to the gateway client.
    LoginAttempted,
    /// A shard is (re)connecting or performing its handshake.
    Connecting,
    /// The handshake finished; `user_tag` identifies the bot account.
    SessionEstablished { user_tag: String, guilds: usize },
    /// The connection dropped; the client will try to reconnect on its own.
    SessionDropped,
    /// The client gave up, or reported an error worth surfacing.
    FatalError(String),
}

pub type LifecycleSender = mpsc::UnboundedSender<LifecycleEvent>;
pub type LifecycleReceiver = mpsc::UnboundedReceiver<LifecycleEvent>;

pub fn channel() -> (LifecycleSender, LifecycleReceiver) {
    mpsc::unbounded_channel()
}

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::gateway::events::{LifecycleEvent, LifecycleReceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionState::Connecting,
            2 => SessionState::Ready,
            _ => SessionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Disconnected => 0,
            SessionState::Connecting => 1,
            SessionState::Ready => 2,
        }
    }
}

/// Mirrors the gateway session's readiness. Written by a single lifecycle
/// task, read by any number of request handlers.
#[derive(Debug)]
pub struct SessionTracker {
    state: AtomicU8,
    established: AtomicU64,
    login_attempted: AtomicBool,
    last_error: ArcSwapOption<String>,
    user_tag: ArcSwapOption<String>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Disconnected.as_u8()),
            established: AtomicU64::new(0),
            login_attempted: AtomicBool::new(false),
            last_error: ArcSwapOption::empty(),
            user_tag: ArcSwapOption::empty(),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Number of transitions into `Ready` since startup.
    pub fn sessions_established(&self) -> u64 {
        self.established.load(Ordering::Relaxed)
    }

    pub fn login_attempted(&self) -> bool {
        self.login_attempted.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|e| e.as_ref().clone())
    }

    /// The error currently keeping the session from becoming ready, if any.
    pub fn blocking_cause(&self) -> Option<String> {
        if self.is_ready() {
            None
        } else {
            self.last_error()
        }
    }

    pub fn user_tag(&self) -> Option<String> {
        self.user_tag.load_full().map(|t| t.as_ref().clone())
    }

    pub fn on_login_attempted(&self) {
        self.login_attempted.store(true, Ordering::Relaxed);
    }

    pub fn on_connecting(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Disconnected.as_u8(),
            SessionState::Connecting.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Marks the session ready. A no-op when already ready.
    pub fn on_session_established(&self) {
        let prev = self
            .state
            .swap(SessionState::Ready.as_u8(), Ordering::AcqRel);
        if prev != SessionState::Ready.as_u8() {
            self.established.fetch_add(1, Ordering::Relaxed);
            self.last_error.store(None);
        }
    }

    pub fn on_session_dropped(&self) {
        self.state
            .store(SessionState::Disconnected.as_u8(), Ordering::Release);
    }

    pub fn on_fatal_error(&self, err: impl Into<String>) {
        self.last_error.store(Some(Arc::new(err.into())));
    }

    pub fn apply(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::LoginAttempted => {
                tracing::info!("gateway login attempted");
                self.on_login_attempted();
            }
            LifecycleEvent::Connecting => {
                tracing::debug!("gateway connecting");
                self.on_connecting();
            }
            LifecycleEvent::SessionEstablished { user_tag, guilds } => {
                if !self.is_ready() {
                    tracing::info!(%user_tag, guilds, "gateway session ready");
                }
                self.user_tag.store(Some(Arc::new(user_tag)));
                self.on_session_established();
            }
            LifecycleEvent::SessionDropped => {
                if self.is_ready() {
                    tracing::warn!("gateway session dropped");
                }
                self.on_session_dropped();
            }
            LifecycleEvent::FatalError(err) => {
                tracing::error!(ready = self.is_ready(), "gateway error: {err}");
                self.on_fatal_error(err);
            }
        }
    }

    /// Applies lifecycle events until every sender is dropped.
    pub async fn run(self: Arc<Self>, mut rx: LifecycleReceiver) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        tracing::debug!("lifecycle channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::events;

    #[test]
    fn test_starts_disconnected() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.state(), SessionState::Disconnected);
        assert!(!tracker.is_ready());
        assert_eq!(tracker.sessions_established(), 0);
    }

    #[test]
    fn test_established_is_idempotent() {
        let tracker = SessionTracker::new();
        tracker.on_session_established();
        tracker.on_session_established();
        assert!(tracker.is_ready());
        assert_eq!(tracker.sessions_established(), 1);
    }

    #[test]
    fn test_drop_then_reestablish_counts_twice() {
        let tracker = SessionTracker::new();
        tracker.on_session_established();
        tracker.on_session_dropped();
        assert_eq!(tracker.state(), SessionState::Disconnected);
        tracker.on_connecting();
        assert_eq!(tracker.state(), SessionState::Connecting);
        tracker.on_session_established();
        assert_eq!(tracker.sessions_established(), 2);
    }

    #[test]
    fn test_connecting_does_not_demote_ready() {
        let tracker = SessionTracker::new();
        tracker.on_session_established();
        tracker.on_connecting();
        assert!(tracker.is_ready());
    }

    #[test]
    fn test_fatal_error_before_ready_blocks() {
        let tracker = SessionTracker::new();
        tracker.on_fatal_error("invalid token");
        assert!(!tracker.is_ready());
        assert_eq!(tracker.blocking_cause().as_deref(), Some("invalid token"));
    }

    #[test]
    fn test_fatal_error_after_ready_keeps_readiness() {
        let tracker = SessionTracker::new();
        tracker.on_session_established();
        tracker.on_fatal_error("transient");
        assert!(tracker.is_ready());
        assert_eq!(tracker.last_error().as_deref(), Some("transient"));
        assert!(tracker.blocking_cause().is_none());
    }

    #[tokio::test]
    async fn test_run_consumes_events() {
        let tracker = Arc::new(SessionTracker::new());
        let (tx, rx) = events::channel();
        let handle = tokio::spawn(tracker.clone().run(rx));

        tx.send(LifecycleEvent::LoginAttempted).unwrap();
        tx.send(LifecycleEvent::Connecting).unwrap();
        tx.send(LifecycleEvent::SessionEstablished {
            user_tag: "relay#0001".into(),
            guilds: 3,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(tracker.is_ready());
        assert!(tracker.login_attempted());
        assert_eq!(tracker.user_tag().as_deref(), Some("relay#0001"));
    }
}

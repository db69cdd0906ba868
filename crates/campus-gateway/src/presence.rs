use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use campus_types::events::GatewayEvent;

/// Online users and the one live connection each of them owns.
///
/// Last connect wins: registering an identity that is already online hands
/// the old connection a [`GatewayEvent::Superseded`] and replaces it.
#[derive(Clone, Default)]
pub struct Presence {
    inner: Arc<PresenceInner>,
}

#[derive(Default)]
struct PresenceInner {
    /// user_id -> (conn_id, sender)
    connections: RwLock<HashMap<String, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`. Returns (conn_id, receiver).
    pub async fn register(&self, user_id: &str) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let previous = self
            .inner
            .connections
            .write()
            .await
            .insert(user_id.to_string(), (conn_id, tx));

        if let Some((old_conn_id, old_tx)) = previous {
            debug!("{} superseded connection {} with {}", user_id, old_conn_id, conn_id);
            let _ = old_tx.send(GatewayEvent::Superseded);
        }

        (conn_id, rx)
    }

    /// Remove the entry for `user_id`, but only if `conn_id` still owns it.
    /// Returns whether anything was removed.
    pub async fn unregister(&self, user_id: &str, conn_id: Uuid) -> bool {
        let mut connections = self.inner.connections.write().await;
        match connections.get(user_id) {
            Some((current, _)) if *current == conn_id => {
                connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.inner.connections.read().await.contains_key(user_id)
    }

    /// Queue an event for `user_id`. Returns `false` if the user is offline
    /// or their connection is already shutting down.
    pub async fn send_to(&self, user_id: &str, event: GatewayEvent) -> bool {
        let connections = self.inner.connections.read().await;
        match connections.get(user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub async fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.inner.connections.read().await.keys().cloned().collect();
        users.sort();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::events::ChatDelivery;

    fn chat(content: &str) -> GatewayEvent {
        GatewayEvent::Chat(ChatDelivery {
            sender_id: "amy".into(),
            content: content.into(),
            timestamp: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn register_and_send() {
        let presence = Presence::new();
        assert!(!presence.is_online("bob").await);
        assert!(!presence.send_to("bob", chat("lost")).await);

        let (_conn, mut rx) = presence.register("bob").await;
        assert!(presence.is_online("bob").await);
        assert!(presence.send_to("bob", chat("hi")).await);

        match rx.recv().await {
            Some(GatewayEvent::Chat(d)) => assert_eq!(d.content, "hi"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn newer_connection_supersedes_older() {
        let presence = Presence::new();
        let (old_conn, mut old_rx) = presence.register("bob").await;
        let (new_conn, mut new_rx) = presence.register("bob").await;

        assert!(matches!(old_rx.recv().await, Some(GatewayEvent::Superseded)));
        // old sender was dropped with the replaced entry
        assert!(old_rx.recv().await.is_none());

        // the stale connection closing must not evict the new one
        assert!(!presence.unregister("bob", old_conn).await);
        assert!(presence.is_online("bob").await);

        assert!(presence.send_to("bob", chat("to new")).await);
        assert!(matches!(new_rx.recv().await, Some(GatewayEvent::Chat(_))));

        assert!(presence.unregister("bob", new_conn).await);
        assert!(!presence.is_online("bob").await);
    }

    #[tokio::test]
    async fn send_to_closed_receiver_reports_failure() {
        let presence = Presence::new();
        let (_conn, rx) = presence.register("bob").await;
        drop(rx);
        assert!(!presence.send_to("bob", chat("hi")).await);
    }

    #[tokio::test]
    async fn online_users_is_sorted() {
        let presence = Presence::new();
        let _c = presence.register("cal").await;
        let _a = presence.register("amy").await;
        assert_eq!(presence.online_users().await, vec!["amy", "cal"]);
    }
}

use std::sync::Arc;

use chrono::{SecondsFormat, SubsecRound, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use campus_db::Database;
use campus_db::models::ChatRow;
use campus_social::{SocialError, relationships, run_blocking, validate};
use campus_types::api::ChatMessage;
use campus_types::events::{ChatDelivery, GatewayEvent, InboundChat};
use campus_types::models::normalize_user_id;

use crate::presence::Presence;

/// What happened to a relayed frame. Only used for logging and tests; the
/// sender never sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    RecipientOffline,
    NotFriends,
    Rejected,
}

/// Routes chat messages between friends through the presence registry.
#[derive(Clone)]
pub struct ChatRelay {
    db: Arc<Database>,
    presence: Presence,
}

impl ChatRelay {
    pub fn new(db: Arc<Database>, presence: Presence) -> Self {
        Self { db, presence }
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Gateway path: fire-and-forget. Authorized messages are recorded in
    /// the chat log, then delivered if the recipient is online.
    pub async fn relay(&self, sender_id: &str, frame: InboundChat) -> RelayOutcome {
        let recipient_id = normalize_user_id(&frame.recipient_id);
        if validate::chat_content(&frame.content).is_err() {
            debug!("{} sent an empty or oversized chat frame, dropping", sender_id);
            return RelayOutcome::Rejected;
        }

        match self.authorize(sender_id, &recipient_id).await {
            Ok(()) => {}
            Err(SocialError::Unauthorized(_)) => {
                debug!("{} is not friends with {}, dropping", sender_id, recipient_id);
                return RelayOutcome::NotFriends;
            }
            Err(e) => {
                error!("Friendship check failed for {}: {:?}", sender_id, e);
                return RelayOutcome::Rejected;
            }
        }

        let message = new_message(sender_id, &recipient_id, frame.content);
        if let Err(e) = self.record(&message).await {
            error!("Failed to store chat {} from {}: {:?}", message.id, sender_id, e);
        }

        if self.deliver(&message).await {
            RelayOutcome::Delivered
        } else {
            debug!("{} is offline, chat from {} not pushed", message.recipient_id, sender_id);
            RelayOutcome::RecipientOffline
        }
    }

    /// REST path: same gate, but failures are reported. Returns the stored
    /// message and whether it was pushed live.
    pub async fn send(
        &self,
        sender_id: &str,
        recipient_id: &str,
        content: String,
    ) -> Result<(ChatMessage, bool), SocialError> {
        let recipient_id = normalize_user_id(recipient_id);
        validate::chat_content(&content)?;
        self.authorize(sender_id, &recipient_id).await?;

        let message = new_message(sender_id, &recipient_id, content);
        self.record(&message).await?;
        let delivered = self.deliver(&message).await;
        Ok((message, delivered))
    }

    async fn authorize(&self, sender_id: &str, recipient_id: &str) -> Result<(), SocialError> {
        let sender = sender_id.to_string();
        let recipient = recipient_id.to_string();
        let friends =
            run_blocking(&self.db, move |db| relationships::are_friends(db, &sender, &recipient)).await?;

        if friends {
            Ok(())
        } else {
            Err(SocialError::Unauthorized("You can only message your friends."))
        }
    }

    async fn record(&self, message: &ChatMessage) -> Result<(), SocialError> {
        let row = ChatRow {
            id: message.id.to_string(),
            sender_id: message.sender_id.clone(),
            recipient_id: message.recipient_id.clone(),
            content: message.content.clone(),
            created_at: message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        run_blocking(&self.db, move |db| Ok(db.insert_chat(&row)?)).await
    }

    async fn deliver(&self, message: &ChatMessage) -> bool {
        let event = GatewayEvent::Chat(ChatDelivery {
            sender_id: message.sender_id.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        });
        self.presence.send_to(&message.recipient_id, event).await
    }
}

fn new_message(sender_id: &str, recipient_id: &str, content: String) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        sender_id: sender_id.to_string(),
        recipient_id: recipient_id.to_string(),
        content,
        // millisecond precision so the stored copy matches what was pushed
        timestamp: Utc::now().trunc_subsecs(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_social::ErrorKind;

    fn relay_with_friends() -> ChatRelay {
        let db = Database::open_in_memory().unwrap();
        for user in ["amy", "bob", "cal"] {
            db.create_user(user, "hash").unwrap();
        }
        relationships::follow(&db, "amy", "bob").unwrap();
        relationships::follow(&db, "bob", "amy").unwrap();
        relationships::follow(&db, "amy", "cal").unwrap();
        ChatRelay::new(Arc::new(db), Presence::new())
    }

    fn frame(to: &str, content: &str) -> InboundChat {
        InboundChat {
            recipient_id: to.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn delivers_between_online_friends() {
        let relay = relay_with_friends();
        let (_conn, mut rx) = relay.presence().register("bob").await;

        let outcome = relay.relay("amy", frame("bob", "hi")).await;
        assert_eq!(outcome, RelayOutcome::Delivered);

        match rx.recv().await {
            Some(GatewayEvent::Chat(d)) => {
                assert_eq!(d.sender_id, "amy");
                assert_eq!(d.content, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(relay.db.chat_history("amy", "bob").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_friends_are_dropped_silently() {
        let relay = relay_with_friends();
        let (_conn, mut rx) = relay.presence().register("cal").await;

        // amy follows cal but cal does not follow back
        assert_eq!(relay.relay("amy", frame("cal", "hi")).await, RelayOutcome::NotFriends);
        assert_eq!(relay.relay("amy", frame("ghost", "hi")).await, RelayOutcome::NotFriends);
        assert!(rx.try_recv().is_err());
        assert!(relay.db.chat_history("amy", "cal").unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_recipient_is_not_an_error() {
        let relay = relay_with_friends();
        assert_eq!(relay.relay("amy", frame("bob", "later")).await, RelayOutcome::RecipientOffline);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let relay = relay_with_friends();
        let (_conn, mut rx) = relay.presence().register("bob").await;
        assert_eq!(relay.relay("amy", frame("bob", "   ")).await, RelayOutcome::Rejected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rest_send_reports_errors() {
        let relay = relay_with_friends();
        let err = relay.send("amy", "cal", "hi".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = relay.send("amy", "bob", String::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let (message, delivered) = relay.send("amy", "bob", "stored".into()).await.unwrap();
        assert!(!delivered);
        assert_eq!(message.recipient_id, "bob");
        let history = relay.db.chat_history("bob", "amy").unwrap();
        assert_eq!(history[0].content, "stored");
    }

    #[tokio::test]
    async fn recipient_ids_are_case_folded() {
        let relay = relay_with_friends();
        let (_conn, mut rx) = relay.presence().register("bob").await;

        assert_eq!(relay.relay("amy", frame(" Bob ", "hi")).await, RelayOutcome::Delivered);
        assert!(matches!(rx.recv().await, Some(GatewayEvent::Chat(_))));

        let (message, _) = relay.send("amy", "BOB", "again".into()).await.unwrap();
        assert_eq!(message.recipient_id, "bob");
        assert_eq!(relay.db.chat_history("amy", "bob").unwrap().len(), 2);
    }
}

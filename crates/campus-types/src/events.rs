use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frame sent FROM client TO server over the chat gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundChat {
    pub recipient_id: String,
    pub content: String,
}

/// Frame sent FROM server TO the recipient of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDelivery {
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything that can be queued for a connected client.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// A chat message to forward as a text frame
    Chat(ChatDelivery),

    /// A newer connection for the same identity took over; close this one
    Superseded,
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, trace, warn};

use campus_types::api::Claims;
use campus_types::events::{GatewayEvent, InboundChat};

use crate::relay::ChatRelay;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Lifecycle of one gateway connection. `Closed` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticated { user_id: String },
    Closed,
}

impl ConnectionState {
    /// Check the identity claim presented at connect time. Anything other
    /// than a valid token closes the connection.
    pub fn authenticate(self, token: Option<&str>, jwt_secret: &str) -> Self {
        match self {
            Self::Unauthenticated => match token.and_then(|t| verify_token(t, jwt_secret)) {
                Some(user_id) => Self::Authenticated { user_id },
                None => Self::Closed,
            },
            other => other,
        }
    }

    pub fn close(self) -> Self {
        Self::Closed
    }
}

fn verify_token(token: &str, jwt_secret: &str) -> Option<String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.sub)
}

/// Handle a single WebSocket connection. `token` comes from the `?token=`
/// query parameter of the upgrade request.
pub async fn handle_connection(
    mut socket: WebSocket,
    relay: ChatRelay,
    token: Option<String>,
    jwt_secret: String,
) {
    let state = ConnectionState::Unauthenticated.authenticate(token.as_deref(), &jwt_secret);

    let user_id = match state {
        ConnectionState::Authenticated { ref user_id } => user_id.clone(),
        _ => {
            warn!("Gateway client presented an invalid identity claim, closing");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "invalid token".into(),
                })))
                .await;
            return;
        }
    };

    info!("{} connected to gateway", user_id);
    run_connection_loop(socket, relay, &user_id).await;

    let state = state.close();
    debug!("{} gateway connection {:?}", user_id, state);
}

async fn run_connection_loop(socket: WebSocket, relay: ChatRelay, user_id: &str) {
    let (mut sender, mut receiver) = socket.split();
    let presence = relay.presence().clone();

    let (conn_id, mut user_rx) = presence.register(user_id).await;

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward queued events -> client, with heartbeat
    let send_user = user_id.to_string();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = user_rx.recv() => {
                    match event {
                        Some(GatewayEvent::Chat(delivery)) => {
                            let text = match serde_json::to_string(&delivery) {
                                Ok(text) => text,
                                Err(e) => {
                                    warn!("Failed to encode chat for {}: {}", send_user, e);
                                    continue;
                                }
                            };
                            if sender.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(GatewayEvent::Superseded) => {
                            info!("{} connected elsewhere, closing older connection", send_user);
                            let _ = sender
                                .send(Message::Close(Some(CloseFrame {
                                    code: close_code::NORMAL,
                                    reason: "superseded".into(),
                                })))
                                .await;
                            break;
                        }
                        None => break,
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read chat frames from client
    let recv_user = user_id.to_string();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<InboundChat>(&text) {
                    Ok(frame) => {
                        let outcome = relay.relay(&recv_user, frame).await;
                        trace!("{} relay outcome: {:?}", recv_user, outcome);
                    }
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("{} bad frame: {} -- raw: {}", recv_user, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    presence.unregister(user_id, conn_id).await;
    info!("{} disconnected from gateway", user_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn token_for(user: &str, secret: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: user.into(),
            exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_claim_authenticates() {
        let token = token_for("amy", SECRET, 3600);
        let state = ConnectionState::Unauthenticated.authenticate(Some(&token), SECRET);
        assert_eq!(state, ConnectionState::Authenticated { user_id: "amy".into() });
    }

    #[test]
    fn missing_or_bad_claims_close() {
        let bad_sig = token_for("amy", "other-secret", 3600);
        let expired = token_for("amy", SECRET, -3600);

        for token in [None, Some("garbage"), Some(bad_sig.as_str()), Some(expired.as_str())] {
            let state = ConnectionState::Unauthenticated.authenticate(token, SECRET);
            assert_eq!(state, ConnectionState::Closed);
        }
    }

    #[test]
    fn closed_is_terminal() {
        let token = token_for("amy", SECRET, 3600);
        let state = ConnectionState::Closed.authenticate(Some(&token), SECRET);
        assert_eq!(state, ConnectionState::Closed);

        let state = ConnectionState::Authenticated { user_id: "amy".into() }.close();
        assert_eq!(state, ConnectionState::Closed);
    }
}

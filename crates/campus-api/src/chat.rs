use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use campus_social::run_blocking;
use campus_types::api::{ChatSentResponse, Claims, SendChatRequest};
use campus_types::models::normalize_user_id;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// REST counterpart of a gateway chat frame. Unlike the gateway, a refused
/// send is reported to the caller.
pub async fn send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = normalize_user_id(&req.recipient_id);

    let (chat, delivered) = state.relay.send(&claims.sub, &recipient, req.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(ChatSentResponse {
            message: "Message sent successfully!".into(),
            delivered,
            chat,
        }),
    ))
}

/// Conversation between the caller and `friend_id`, oldest first. Messages
/// stay readable after an unfriend.
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(friend_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let friend = normalize_user_id(&friend_id);

    let rows = run_blocking(&state.db, move |db| Ok(db.chat_history(&claims.sub, &friend)?)).await?;

    Ok(Json(rows.into_iter().map(convert::chat).collect::<Vec<_>>()))
}

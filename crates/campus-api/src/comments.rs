use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use campus_db::{Database, models::CommentRow, timestamp_now};
use campus_social::{
    SocialError, run_blocking, validate,
    votes::{self, VoteTarget},
};
use campus_types::api::{Claims, CommentEnvelope, CreateCommentRequest, VoteRequest, VoteResponse};
use campus_types::models::{Votes, normalize_user_id};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// The post must exist and be visible to `viewer`.
fn visible_post(db: &Database, post_id: &str, viewer: Option<&str>) -> Result<(), SocialError> {
    match db.get_post(post_id)? {
        Some(post) if post.visible_to(viewer) => Ok(()),
        _ => Err(SocialError::NotFound("Post")),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate::comment(&req.content)?;

    let row = CommentRow {
        id: Uuid::new_v4().to_string(),
        post_id,
        author: claims.sub.clone(),
        content,
        votes: Votes::default(),
        created_at: timestamp_now(),
    };

    let stored = row.clone();
    run_blocking(&state.db, move |db| {
        visible_post(db, &stored.post_id, Some(&stored.author))?;
        Ok(db.insert_comment(&stored)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            message: "Comment added successfully".into(),
            comment: convert::comment(row, Some(&claims.sub)),
        }),
    ))
}

pub async fn list_for_post(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.map(|Extension(c)| c.sub);

    let rows = {
        let viewer = viewer.clone();
        run_blocking(&state.db, move |db| {
            visible_post(db, &post_id, viewer.as_deref())?;
            Ok(db.list_comments_for_post(&post_id)?)
        })
        .await?
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| convert::comment(row, viewer.as_deref()))
            .collect::<Vec<_>>(),
    ))
}

/// Skips comments under posts hidden from the caller.
pub async fn list_by_user(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.map(|Extension(c)| c.sub);
    let author = normalize_user_id(&user_id);

    let rows = {
        let viewer = viewer.clone();
        run_blocking(&state.db, move |db| {
            Ok(db.list_comments_by_author(&author, viewer.as_deref())?)
        })
        .await?
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| convert::comment(row, viewer.as_deref()))
            .collect::<Vec<_>>(),
    ))
}

pub async fn vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = run_blocking(&state.db, move |db| {
        votes::vote(db, VoteTarget::Comment(&comment_id), &claims.sub, &req.vote_type)
    })
    .await?;

    Ok(Json(VoteResponse {
        message: "Comment vote updated".into(),
        upvotes: outcome.upvotes,
        downvotes: outcome.downvotes,
        user_vote: outcome.user_vote,
    }))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use campus_db::{Database, models::PostRow, timestamp_now};
use campus_social::{
    SocialError, run_blocking, validate,
    votes::{self, VoteTarget},
};
use campus_types::api::{
    Claims, CreatePostRequest, EditPostRequest, MessageResponse, PostEnvelope, PostResponse,
    VisibilityResponse, VoteRequest, VoteResponse,
};
use campus_types::models::{VoteType, Votes, normalize_user_id};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

fn viewer_of(claims: &Option<Extension<Claims>>) -> Option<String> {
    claims.as_ref().map(|Extension(c)| c.sub.clone())
}

/// Load a post the caller authored. Someone else's post is `Unauthorized`,
/// a missing one `NotFound`.
fn owned_post(db: &Database, id: &str, caller: &str, denied: &'static str) -> Result<PostRow, SocialError> {
    let post = db.get_post(id)?.ok_or(SocialError::NotFound("Post"))?;
    if post.user_id != caller {
        return Err(SocialError::Unauthorized(denied));
    }
    Ok(post)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = validate::post_title(&req.title)?;
    let content = validate::post_content(&req.content)?;

    let row = PostRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.clone(),
        title,
        content,
        is_hidden: false,
        votes: Votes::default(),
        created_at: timestamp_now(),
    };

    let stored = row.clone();
    run_blocking(&state.db, move |db| Ok(db.insert_post(&stored)?)).await?;
    info!("{} created post {}", claims.sub, row.id);

    Ok((
        StatusCode::CREATED,
        Json(PostEnvelope {
            message: "Post created successfully".into(),
            post: convert::post(row, Some(&claims.sub)),
        }),
    ))
}

pub async fn list_all(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = viewer_of(&claims);

    let rows = {
        let viewer = viewer.clone();
        run_blocking(&state.db, move |db| Ok(db.list_posts(viewer.as_deref())?)).await?
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| convert::post(row, viewer.as_deref()))
            .collect::<Vec<_>>(),
    ))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = viewer_of(&claims);
    let author = normalize_user_id(&user_id);

    let rows = {
        let viewer = viewer.clone();
        run_blocking(&state.db, move |db| {
            Ok(db.list_posts_by_author(&author, viewer.as_deref())?)
        })
        .await?
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| convert::post(row, viewer.as_deref()))
            .collect::<Vec<_>>(),
    ))
}

pub async fn list_upvoted(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    list_voted_by(state, viewer_of(&claims), user_id, VoteType::Upvote).await
}

pub async fn list_downvoted(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    list_voted_by(state, viewer_of(&claims), user_id, VoteType::Downvote).await
}

async fn list_voted_by(
    state: AppState,
    viewer: Option<String>,
    user_id: String,
    vote: VoteType,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let voter = normalize_user_id(&user_id);

    let rows = {
        let viewer = viewer.clone();
        run_blocking(&state.db, move |db| {
            Ok(db.list_posts_voted_by(&voter, vote, viewer.as_deref())?)
        })
        .await?
    };

    Ok(Json(
        rows.into_iter()
            .map(|row| convert::post(row, viewer.as_deref()))
            .collect(),
    ))
}

/// Hidden posts read as missing to everyone but their author.
pub async fn get_one(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = viewer_of(&claims);

    let post = run_blocking(&state.db, move |db| {
        db.get_post(&post_id)?.ok_or(SocialError::NotFound("Post"))
    })
    .await?;

    if !post.visible_to(viewer.as_deref()) {
        return Err(SocialError::NotFound("Post").into());
    }

    Ok(Json(convert::post(post, viewer.as_deref())))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Json(req): Json<EditPostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.as_deref().map(validate::post_title).transpose()?;
    let content = req.content.as_deref().map(validate::post_content).transpose()?;

    let caller = claims.sub.clone();
    let post = run_blocking(&state.db, move |db| {
        let mut post = owned_post(db, &post_id, &caller, "You can only edit your own posts.")?;
        if let Some(title) = title {
            post.title = title;
        }
        if let Some(content) = content {
            post.content = content;
        }
        if !db.update_post_content(&post.id, &post.title, &post.content)? {
            return Err(SocialError::NotFound("Post"));
        }
        Ok(post)
    })
    .await?;

    Ok(Json(PostEnvelope {
        message: "Post updated successfully".into(),
        post: convert::post(post, Some(&claims.sub)),
    }))
}

/// Removes the post together with its comments.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.sub.clone();
    run_blocking(&state.db, move |db| {
        owned_post(db, &post_id, &caller, "You can only delete your own posts.")?;
        if !db.delete_post(&post_id)? {
            return Err(SocialError::NotFound("Post"));
        }
        info!("{} deleted post {}", caller, post_id);
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let is_hidden = run_blocking(&state.db, move |db| {
        let post = owned_post(db, &post_id, &claims.sub, "You can only hide your own posts.")?;
        let hidden = !post.is_hidden;
        if !db.set_post_hidden(&post_id, hidden)? {
            return Err(SocialError::NotFound("Post"));
        }
        Ok(hidden)
    })
    .await?;

    let message = if is_hidden { "Post hidden" } else { "Post visible" };
    Ok(Json(VisibilityResponse {
        message: message.into(),
        is_hidden,
    }))
}

pub async fn vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = run_blocking(&state.db, move |db| {
        votes::vote(db, VoteTarget::Post(&post_id), &claims.sub, &req.vote_type)
    })
    .await?;

    Ok(Json(VoteResponse {
        message: "Vote updated".into(),
        upvotes: outcome.upvotes,
        downvotes: outcome.downvotes,
        user_vote: outcome.user_vote,
    }))
}

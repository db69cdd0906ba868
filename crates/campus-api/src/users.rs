use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use campus_social::{SocialError, relationships, run_blocking, validate};
use campus_types::api::{
    Claims, FollowRequest, FollowResponse, FriendEntry, FriendRequest, MessageResponse,
    StatusResponse, UpdateStatusRequest,
};
use campus_types::models::normalize_user_id;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state.db, move |db| {
        db.get_user(&claims.sub)?.ok_or(SocialError::NotFound("User"))
    })
    .await?;

    Ok(Json(convert::profile(user)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = normalize_user_id(&user_id);
    let user = run_blocking(&state.db, move |db| {
        db.get_user(&user_id)?.ok_or(SocialError::NotFound("User"))
    })
    .await?;

    Ok(Json(convert::profile(user)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = validate::status(&req.status)?;

    let stored = status.clone();
    run_blocking(&state.db, move |db| {
        if db.update_status(&claims.sub, &stored)? {
            Ok(())
        } else {
            Err(SocialError::NotFound("User"))
        }
    })
    .await?;

    Ok(Json(StatusResponse {
        message: "Status updated successfully".into(),
        status,
    }))
}

/// The caller may only create or remove their own follow edges.
pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (follower, followee) = acting_follower(&claims, &req)?;

    let outcome =
        run_blocking(&state.db, move |db| relationships::follow(db, &follower, &followee)).await?;

    Ok(Json(FollowResponse {
        message: "Followed successfully!".into(),
        became_friends: outcome.became_friends,
    }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (follower, followee) = acting_follower(&claims, &req)?;

    run_blocking(&state.db, move |db| relationships::unfollow(db, &follower, &followee)).await?;

    Ok(Json(MessageResponse::new("Unfollowed successfully!")))
}

pub async fn add_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (a, b) = acting_member(&claims, &req)?;

    run_blocking(&state.db, move |db| relationships::add_friend(db, &a, &b)).await?;

    Ok(Json(MessageResponse::new("Friends added successfully!")))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (a, b) = acting_member(&claims, &req)?;

    run_blocking(&state.db, move |db| relationships::remove_friend(db, &a, &b)).await?;

    Ok(Json(MessageResponse::new("Friend removed successfully!")))
}

pub async fn friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let friend_ids =
        run_blocking(&state.db, move |db| relationships::friends_of(db, &claims.sub)).await?;

    let presence = state.relay.presence();
    let mut entries = Vec::with_capacity(friend_ids.len());
    for user_id in friend_ids {
        let online = presence.is_online(&user_id).await;
        entries.push(FriendEntry { user_id, online });
    }

    Ok(Json(entries))
}

fn acting_follower(claims: &Claims, req: &FollowRequest) -> Result<(String, String), SocialError> {
    let follower = normalize_user_id(&req.follower_id);
    if follower != claims.sub {
        return Err(SocialError::Unauthorized("You can only follow on your own behalf."));
    }
    Ok((follower, normalize_user_id(&req.followee_id)))
}

fn acting_member(claims: &Claims, req: &FriendRequest) -> Result<(String, String), SocialError> {
    let a = normalize_user_id(&req.user_id1);
    let b = normalize_user_id(&req.user_id2);
    if a != claims.sub && b != claims.sub {
        return Err(SocialError::Unauthorized("You can only change your own friendships."));
    }
    Ok((a, b))
}

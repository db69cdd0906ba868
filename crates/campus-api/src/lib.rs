pub mod auth;
pub mod chat;
pub mod comments;
pub mod convert;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
};

use crate::auth::AppState;
use crate::middleware::{optional_auth, require_auth};

/// REST surface under `/api` plus `/health`. The gateway route is mounted by
/// the binary since it needs the connection handler's own state.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/users/{user_id}", get(users::get_profile))
        .route("/health", get(health));

    // Anonymous readers allowed; a valid token personalises `userVote`
    let optional_routes = Router::new()
        .route("/api/posts", get(posts::list_all))
        .route("/api/posts/user/{user_id}", get(posts::list_by_user))
        .route("/api/posts/upvoted/{user_id}", get(posts::list_upvoted))
        .route("/api/posts/downvoted/{user_id}", get(posts::list_downvoted))
        .route("/api/posts/{post_id}", get(posts::get_one))
        .route("/api/comments/{post_id}", get(comments::list_for_post))
        .route("/api/comments/user/{user_id}", get(comments::list_by_user))
        .layer(from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/api/users/me", get(users::me))
        .route("/api/users/update-status", patch(users::update_status))
        .route("/api/users/follow", post(users::follow))
        .route("/api/users/unfollow", post(users::unfollow))
        .route("/api/users/add-friend", post(users::add_friend))
        .route("/api/users/remove-friend", post(users::remove_friend))
        .route("/api/users/friends", get(users::friends))
        .route("/api/users/chat/{friend_id}", get(chat::history))
        .route("/api/chat/send", post(chat::send))
        .route("/api/posts/create", post(posts::create))
        .route("/api/posts/{post_id}", put(posts::edit).delete(posts::delete))
        .route("/api/posts/{post_id}/toggle-visibility", put(posts::toggle_visibility))
        .route("/api/posts/{post_id}/vote", post(posts::vote))
        .route("/api/comments/{post_id}", post(comments::create))
        .route("/api/comments/vote/{comment_id}", post(comments::vote))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

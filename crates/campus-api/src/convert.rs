//! Stored documents -> API responses.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use campus_db::models::{ChatRow, CommentRow, PostRow, UserRow};
use campus_types::api::{ChatMessage, CommentResponse, PostResponse, UserProfile};

fn timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner, e);
        DateTime::default()
    })
}

fn uuid(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub fn profile(user: UserRow) -> UserProfile {
    UserProfile {
        created_at: timestamp(&user.created_at, &user.id),
        updated_at: timestamp(&user.updated_at, &user.id),
        followers: user.relations.followers.to_vec(),
        following: user.relations.following.to_vec(),
        friends: user.relations.friends.to_vec(),
        user_id: user.id,
        avatar: user.avatar,
        status: user.status,
        title: user.title,
    }
}

/// `viewer` decides `userVote`; anonymous callers always see `None`.
pub fn post(row: PostRow, viewer: Option<&str>) -> PostResponse {
    PostResponse {
        id: uuid(&row.id),
        created_at: timestamp(&row.created_at, &row.id),
        upvotes: row.votes.upvotes(),
        downvotes: row.votes.downvotes(),
        user_vote: viewer.and_then(|v| row.votes.vote_of(v)),
        author: row.user_id,
        title: row.title,
        content: row.content,
        is_hidden: row.is_hidden,
    }
}

pub fn comment(row: CommentRow, viewer: Option<&str>) -> CommentResponse {
    CommentResponse {
        id: uuid(&row.id),
        post_id: uuid(&row.post_id),
        created_at: timestamp(&row.created_at, &row.id),
        upvotes: row.votes.upvotes(),
        downvotes: row.votes.downvotes(),
        user_vote: viewer.and_then(|v| row.votes.vote_of(v)),
        author: row.author,
        content: row.content,
    }
}

pub fn chat(row: ChatRow) -> ChatMessage {
    ChatMessage {
        id: uuid(&row.id),
        timestamp: timestamp(&row.created_at, &row.id),
        sender_id: row.sender_id,
        recipient_id: row.recipient_id,
        content: row.content,
    }
}

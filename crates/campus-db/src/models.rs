//! Document types as stored. Timestamps stay as their stored RFC 3339
//! strings; identity sets are decoded from their JSON columns.

use campus_types::models::{Relations, Votes};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub password: String,
    pub avatar: String,
    pub status: String,
    pub title: String,
    pub relations: Relations,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub is_hidden: bool,
    pub votes: Votes,
    pub created_at: String,
}

impl PostRow {
    /// Hidden posts exist only for their author.
    pub fn visible_to(&self, viewer: Option<&str>) -> bool {
        !self.is_hidden || viewer == Some(self.user_id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author: String,
    pub content: String,
    pub votes: Votes,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ChatRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub created_at: String,
}

use crate::models::{ChatRow, CommentRow, PostRow, UserRow};
use crate::{Database, timestamp_now};
use anyhow::Result;
use campus_types::models::{
    DEFAULT_AVATAR, DEFAULT_STATUS, DEFAULT_TITLE, Relations, VoteType, Votes,
};
use rusqlite::{Connection, Row};
use serde::Serialize;
use serde::de::DeserializeOwned;

const USER_COLUMNS: &str =
    "id, password, avatar, status, title, followers, following, friends, created_at, updated_at";
const POST_COLUMNS: &str =
    "id, user_id, title, content, is_hidden, upvoted_by, downvoted_by, created_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, author, content, upvoted_by, downvoted_by, created_at";

impl Database {
    // -- Users --

    /// Insert a new user with default profile fields and empty sets.
    /// Returns `false` if the id is already taken.
    pub fn create_user(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let now = timestamp_now();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, password, avatar, status, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, password_hash, DEFAULT_AVATAR, DEFAULT_STATUS, DEFAULT_TITLE, now],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Overwrite the relationship sets of one user document.
    /// Returns `false` if the user does not exist.
    pub fn save_relations(&self, id: &str, relations: &Relations) -> Result<bool> {
        let followers = to_json(&relations.followers)?;
        let following = to_json(&relations.following)?;
        let friends = to_json(&relations.friends)?;

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET followers = ?2, following = ?3, friends = ?4, updated_at = ?5 WHERE id = ?1",
                rusqlite::params![id, followers, following, friends, timestamp_now()],
            )?;
            Ok(updated == 1)
        })
    }

    pub fn update_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1",
                (id, status, timestamp_now()),
            )?;
            Ok(updated == 1)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, post: &PostRow) -> Result<()> {
        let upvoted_by = to_json(&post.votes.upvoted_by)?;
        let downvoted_by = to_json(&post.votes.downvoted_by)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, title, content, is_hidden, upvoted_by, downvoted_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    post.id,
                    post.user_id,
                    post.title,
                    post.content,
                    post.is_hidden,
                    upvoted_by,
                    downvoted_by,
                    post.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
            conn.query_row(&sql, [id], post_from_row).optional()
        })
    }

    /// Public feed, newest first. Hidden posts are only included for their
    /// own author.
    pub fn list_posts(&self, viewer: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE is_hidden = 0 OR user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_posts(conn, &sql, rusqlite::params![viewer.unwrap_or_default()])
        })
    }

    pub fn list_posts_by_author(&self, author: &str, viewer: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE user_id = ?1 AND (is_hidden = 0 OR user_id = ?2)
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_posts(conn, &sql, rusqlite::params![author, viewer.unwrap_or_default()])
        })
    }

    /// Posts whose vote ledger has `voter` in the set for `vote`.
    pub fn list_posts_voted_by(
        &self,
        voter: &str,
        vote: VoteType,
        viewer: Option<&str>,
    ) -> Result<Vec<PostRow>> {
        let column = vote_column(vote);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE EXISTS (SELECT 1 FROM json_each(posts.{column}) WHERE json_each.value = ?1)
                   AND (is_hidden = 0 OR user_id = ?2)
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_posts(conn, &sql, rusqlite::params![voter, viewer.unwrap_or_default()])
        })
    }

    pub fn update_post_content(&self, id: &str, title: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE posts SET title = ?2, content = ?3 WHERE id = ?1",
                (id, title, content),
            )?;
            Ok(updated == 1)
        })
    }

    pub fn set_post_hidden(&self, id: &str, hidden: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let updated =
                conn.execute("UPDATE posts SET is_hidden = ?2 WHERE id = ?1", rusqlite::params![id, hidden])?;
            Ok(updated == 1)
        })
    }

    pub fn save_post_votes(&self, id: &str, votes: &Votes) -> Result<bool> {
        self.save_votes("posts", id, votes)
    }

    /// Delete a post together with its comments. Returns `false` if the post
    /// did not exist.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(deleted == 1)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, comment: &CommentRow) -> Result<()> {
        let upvoted_by = to_json(&comment.votes.upvoted_by)?;
        let downvoted_by = to_json(&comment.votes.downvoted_by)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author, content, upvoted_by, downvoted_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    comment.id,
                    comment.post_id,
                    comment.author,
                    comment.content,
                    upvoted_by,
                    downvoted_by,
                    comment.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
            conn.query_row(&sql, [id], comment_from_row).optional()
        })
    }

    pub fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_comments(conn, &sql, [post_id])
        })
    }

    /// Comments by `author`, newest first, leaving out those under posts
    /// hidden from `viewer`.
    pub fn list_comments_by_author(&self, author: &str, viewer: Option<&str>) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE author = ?1
                   AND post_id IN (SELECT id FROM posts WHERE is_hidden = 0 OR user_id = ?2)
                 ORDER BY created_at DESC, rowid DESC"
            );
            collect_comments(conn, &sql, rusqlite::params![author, viewer.unwrap_or_default()])
        })
    }

    pub fn save_comment_votes(&self, id: &str, votes: &Votes) -> Result<bool> {
        self.save_votes("comments", id, votes)
    }

    // -- Chats --

    pub fn insert_chat(&self, chat: &ChatRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (id, sender_id, recipient_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (&chat.id, &chat.sender_id, &chat.recipient_id, &chat.content, &chat.created_at),
            )?;
            Ok(())
        })
    }

    /// Both directions of a conversation, oldest first.
    pub fn chat_history(&self, user_a: &str, user_b: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, recipient_id, content, created_at FROM chats
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([user_a, user_b], |row| {
                    Ok(ChatRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    fn save_votes(&self, table: &'static str, id: &str, votes: &Votes) -> Result<bool> {
        let upvoted_by = to_json(&votes.upvoted_by)?;
        let downvoted_by = to_json(&votes.downvoted_by)?;

        self.with_conn(|conn| {
            let sql = format!("UPDATE {table} SET upvoted_by = ?2, downvoted_by = ?3 WHERE id = ?1");
            let updated = conn.execute(&sql, (id, upvoted_by, downvoted_by))?;
            Ok(updated == 1)
        })
    }
}

fn vote_column(vote: VoteType) -> &'static str {
    match vote {
        VoteType::Upvote => "upvoted_by",
        VoteType::Downvote => "downvoted_by",
    }
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            password: row.get(1)?,
            avatar: row.get(2)?,
            status: row.get(3)?,
            title: row.get(4)?,
            relations: Relations {
                followers: json_column(row, 5)?,
                following: json_column(row, 6)?,
                friends: json_column(row, 7)?,
            },
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    })
    .optional()
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        is_hidden: row.get(4)?,
        votes: Votes {
            upvoted_by: json_column(row, 5)?,
            downvoted_by: json_column(row, 6)?,
        },
        created_at: row.get(7)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        votes: Votes {
            upvoted_by: json_column(row, 4)?,
            downvoted_by: json_column(row, 5)?,
        },
        created_at: row.get(6)?,
    })
}

fn collect_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn collect_comments<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, comment_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Decode a JSON document column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_types::models::IdSet;

    fn post(id: &str, author: &str, created_at: &str) -> PostRow {
        PostRow {
            id: id.into(),
            user_id: author.into(),
            title: format!("title {id}"),
            content: String::new(),
            is_hidden: false,
            votes: Votes::default(),
            created_at: created_at.into(),
        }
    }

    fn comment(id: &str, post_id: &str, author: &str) -> CommentRow {
        CommentRow {
            id: id.into(),
            post_id: post_id.into(),
            author: author.into(),
            content: "nice".into(),
            votes: Votes::default(),
            created_at: timestamp_now(),
        }
    }

    #[test]
    fn create_user_rejects_duplicates_and_sets_defaults() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("amy", "hash").unwrap());
        assert!(!db.create_user("amy", "other").unwrap());

        let user = db.get_user("amy").unwrap().unwrap();
        assert_eq!(user.password, "hash");
        assert_eq!(user.avatar, DEFAULT_AVATAR);
        assert_eq!(user.status, DEFAULT_STATUS);
        assert_eq!(user.title, DEFAULT_TITLE);
        assert_eq!(user.relations, Relations::default());
        assert!(db.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn relations_round_trip_through_json_columns() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("amy", "hash").unwrap();

        let relations = Relations {
            followers: ["bob"].into_iter().collect(),
            following: ["bob", "cal"].into_iter().collect(),
            friends: ["bob"].into_iter().collect(),
        };
        assert!(db.save_relations("amy", &relations).unwrap());
        assert!(!db.save_relations("ghost", &relations).unwrap());

        let stored = db.get_user("amy").unwrap().unwrap();
        assert_eq!(stored.relations, relations);
    }

    #[test]
    fn feed_is_newest_first_and_hides_hidden_posts_from_others() {
        let db = Database::open_in_memory().unwrap();
        db.insert_post(&post("p1", "amy", "2024-01-01T00:00:00.000Z")).unwrap();
        db.insert_post(&post("p2", "bob", "2024-01-02T00:00:00.000Z")).unwrap();
        db.insert_post(&post("p3", "amy", "2024-01-03T00:00:00.000Z")).unwrap();
        db.set_post_hidden("p3", true).unwrap();

        let ids = |rows: Vec<PostRow>| rows.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(db.list_posts(None).unwrap()), vec!["p2", "p1"]);
        assert_eq!(ids(db.list_posts(Some("amy")).unwrap()), vec!["p3", "p2", "p1"]);
        assert_eq!(ids(db.list_posts_by_author("amy", Some("bob")).unwrap()), vec!["p1"]);
    }

    #[test]
    fn posts_voted_by_filters_on_the_right_set() {
        let db = Database::open_in_memory().unwrap();
        db.insert_post(&post("p1", "amy", "2024-01-01T00:00:00.000Z")).unwrap();
        db.insert_post(&post("p2", "amy", "2024-01-02T00:00:00.000Z")).unwrap();

        let mut votes = Votes::default();
        votes.upvoted_by.insert("bob");
        db.save_post_votes("p1", &votes).unwrap();

        let mut votes = Votes::default();
        votes.downvoted_by = IdSet::from_iter(["bob", "cal"]);
        db.save_post_votes("p2", &votes).unwrap();

        let up = db.list_posts_voted_by("bob", VoteType::Upvote, None).unwrap();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].id, "p1");

        let down = db.list_posts_voted_by("cal", VoteType::Downvote, None).unwrap();
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].id, "p2");
        assert_eq!(down[0].votes.downvotes(), 2);
    }

    #[test]
    fn deleting_a_post_removes_its_comments() {
        let db = Database::open_in_memory().unwrap();
        db.insert_post(&post("p1", "amy", "2024-01-01T00:00:00.000Z")).unwrap();
        db.insert_comment(&comment("c1", "p1", "bob")).unwrap();
        db.insert_comment(&comment("c2", "p1", "cal")).unwrap();

        assert_eq!(db.list_comments_for_post("p1").unwrap().len(), 2);
        assert!(db.delete_post("p1").unwrap());
        assert!(!db.delete_post("p1").unwrap());
        assert!(db.list_comments_for_post("p1").unwrap().is_empty());
        assert!(db.get_comment("c1").unwrap().is_none());
    }

    #[test]
    fn comments_by_author_skip_posts_hidden_from_the_viewer() {
        let db = Database::open_in_memory().unwrap();
        db.insert_post(&post("p1", "amy", "2024-01-01T00:00:00.000Z")).unwrap();
        db.insert_post(&post("p2", "cal", "2024-01-02T00:00:00.000Z")).unwrap();
        db.insert_comment(&comment("c1", "p1", "bob")).unwrap();
        db.insert_comment(&comment("c2", "p2", "bob")).unwrap();
        db.set_post_hidden("p1", true).unwrap();

        let ids = |rows: Vec<CommentRow>| rows.into_iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(db.list_comments_by_author("bob", None).unwrap()), vec!["c2"]);
        assert_eq!(ids(db.list_comments_by_author("bob", Some("bob")).unwrap()), vec!["c2"]);
        assert_eq!(db.list_comments_by_author("bob", Some("amy")).unwrap().len(), 2);
    }

    #[test]
    fn chat_history_includes_both_directions_in_order() {
        let db = Database::open_in_memory().unwrap();
        let chat = |id: &str, from: &str, to: &str, at: &str| ChatRow {
            id: id.into(),
            sender_id: from.into(),
            recipient_id: to.into(),
            content: format!("msg {id}"),
            created_at: at.into(),
        };
        db.insert_chat(&chat("m2", "bob", "amy", "2024-01-01T00:00:02.000Z")).unwrap();
        db.insert_chat(&chat("m1", "amy", "bob", "2024-01-01T00:00:01.000Z")).unwrap();
        db.insert_chat(&chat("m3", "amy", "cal", "2024-01-01T00:00:03.000Z")).unwrap();

        let history = db.chat_history("amy", "bob").unwrap();
        let ids: Vec<_> = history.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }
}

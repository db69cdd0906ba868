use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Documents keep their identity sets as JSON arrays (`'[]'` when empty).
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            password    TEXT NOT NULL,
            avatar      TEXT NOT NULL,
            status      TEXT NOT NULL,
            title       TEXT NOT NULL,
            followers   TEXT NOT NULL DEFAULT '[]',
            following   TEXT NOT NULL DEFAULT '[]',
            friends     TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            title           TEXT NOT NULL,
            content         TEXT NOT NULL DEFAULT '',
            is_hidden       INTEGER NOT NULL DEFAULT 0,
            upvoted_by      TEXT NOT NULL DEFAULT '[]',
            downvoted_by    TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id              TEXT PRIMARY KEY,
            post_id         TEXT NOT NULL,
            author          TEXT NOT NULL,
            content         TEXT NOT NULL,
            upvoted_by      TEXT NOT NULL DEFAULT '[]',
            downvoted_by    TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_comments_author
            ON comments(author, created_at);

        CREATE TABLE IF NOT EXISTS chats (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL,
            recipient_id    TEXT NOT NULL,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chats_pair
            ON chats(sender_id, recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

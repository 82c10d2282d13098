use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, posts, logs)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                email       TEXT,
                phone       TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                body        TEXT NOT NULL,
                image_url   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created ON posts(created_at);
            CREATE INDEX idx_posts_title ON posts(title);

            -- No foreign keys: entries must survive deletion of the post or user.
            CREATE TABLE logs (
                id              TEXT PRIMARY KEY,
                method          TEXT NOT NULL CHECK (method IN ('CREATE', 'UPDATE', 'DELETE')),
                target_post_id  TEXT NOT NULL,
                username        TEXT NOT NULL,
                old_value       TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_logs_username ON logs(username, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

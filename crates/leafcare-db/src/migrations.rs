use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                image       TEXT,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE questions (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                author_id   TEXT NOT NULL REFERENCES users(id),
                views       INTEGER NOT NULL DEFAULT 0,
                answers     INTEGER NOT NULL DEFAULT 0,
                upvotes     INTEGER NOT NULL DEFAULT 0,
                downvotes   INTEGER NOT NULL DEFAULT 0,
                image_url   TEXT,
                crop        TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_questions_created ON questions(created_at);

            CREATE TABLE answers (
                id          TEXT PRIMARY KEY,
                question_id TEXT NOT NULL REFERENCES questions(id),
                author_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                upvotes     INTEGER NOT NULL DEFAULT 0,
                downvotes   INTEGER NOT NULL DEFAULT 0,
                image_url   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_answers_question ON answers(question_id, created_at);

            CREATE TABLE chats (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_chats_author ON chats(author_id, created_at);

            CREATE TABLE chat_messages (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id           TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                sender            TEXT NOT NULL CHECK (sender IN ('user', 'ai')),
                content           TEXT NOT NULL,
                image_url         TEXT,
                detected_disease  TEXT,
                timestamp         TEXT NOT NULL
            );

            CREATE INDEX idx_chat_messages_chat ON chat_messages(chat_id, id);

            CREATE TABLE votes (
                id           TEXT PRIMARY KEY,
                author_id    TEXT NOT NULL REFERENCES users(id),
                target_id    TEXT NOT NULL,
                target_type  TEXT NOT NULL CHECK (target_type IN ('question', 'answer')),
                vote_type    TEXT NOT NULL CHECK (vote_type IN ('upvote', 'downvote')),
                created_at   TEXT NOT NULL,
                UNIQUE(author_id, target_id, target_type)
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

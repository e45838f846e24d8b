use std::str::FromStr;

use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, SqlitePool};

/// Current unix time in milliseconds, evaluated by sqlite at write time.
#[macro_export]
macro_rules! now_ms {
    () => {
        "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)"
    };
}

// unique: users.username (lowercased), accounts.login
// messages are ordered by (created_at, seq); seq is the insertion order
pub const SCHEMA: &str = concat!(
    "CREATE TABLE IF NOT EXISTS users (
        uid TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts (
        uid TEXT PRIMARY KEY,
        login TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        participant_lo TEXT NOT NULL,
        participant_hi TEXT NOT NULL,
        last_updated INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS chats_by_lo ON chats (participant_lo);
    CREATE INDEX IF NOT EXISTS chats_by_hi ON chats (participant_hi);

    CREATE TABLE IF NOT EXISTS messages (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        chat_id TEXT NOT NULL,
        from_uid TEXT NOT NULL,
        text TEXT,
        image_url TEXT,
        created_at INTEGER NOT NULL DEFAULT (", now_ms!(), "),
        deleted INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS messages_by_chat ON messages (chat_id, created_at, seq);"
);

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    init(&db_pool).await?;
    Ok(db_pool)
}

pub async fn init(db_pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::raw_sql(SCHEMA).execute(db_pool).await?;
    Ok(())
}

/// A private in-memory database. Every query goes through the one
/// connection, so they all see the same data.
#[cfg(test)]
pub(crate) async fn memory() -> SqlitePool {
    let db_pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init(&db_pool).await.unwrap();
    db_pool
}

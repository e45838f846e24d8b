//! One-to-one conversations.
//!
//! A conversation between two participants is keyed by [`chat_id`], so both
//! sides arrive at the same thread without any lookup. The conversation row
//! itself is created by the first message and only tracks activity.

pub mod msg;
mod window;
mod ws;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use sqlx::SqlitePool;

use crate::{now_ms, AppState, ChatResult};

/// Largest accepted send request, image included.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/c/{peer_uid}", get(window::chat_window))
        .route("/c/{peer_uid}/send", post(window::send).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .route("/c/{peer_uid}/m/{message_id}/delete", post(window::delete))
        .route("/c/{peer_uid}/ws", get(ws::chat_ws))
}

/// The conversation key for two participants: the smaller id, `_`, the larger.
/// Argument order never matters.
pub fn chat_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    format!("{lo}_{hi}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub peer_uid: String,
    pub peer_username: String,
    pub last_updated: i64,
}

/// Record activity on a conversation, creating it on first use.
pub async fn upsert_conversation(db_pool: &SqlitePool, a: &str, b: &str) -> ChatResult<()> {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    sqlx::query(concat!(
        "INSERT INTO chats (id,participant_lo,participant_hi,last_updated) VALUES (?,?,?,", now_ms!(), ") ",
        "ON CONFLICT(id) DO UPDATE SET last_updated=excluded.last_updated"
    ))
    .bind(chat_id(a, b))
    .bind(lo)
    .bind(hi)
    .execute(db_pool)
    .await?;

    Ok(())
}

/// Conversations `uid` takes part in, most recently active first.
pub async fn conversations_for(db_pool: &SqlitePool, uid: &str) -> ChatResult<Vec<Conversation>> {
    let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
        "SELECT c.id, c.peer, COALESCE(u.username, '?'), c.last_updated
         FROM (SELECT id, last_updated,
                      CASE WHEN participant_lo=? THEN participant_hi ELSE participant_lo END AS peer
               FROM chats WHERE participant_lo=? OR participant_hi=?) AS c
         LEFT JOIN users u ON u.uid=c.peer
         ORDER BY c.last_updated DESC, c.id",
    )
    .bind(uid)
    .bind(uid)
    .bind(uid)
    .fetch_all(db_pool)
    .await?;

    Ok(
        rows.into_iter()
            .map(|(id, peer_uid, peer_username, last_updated)| Conversation { id, peer_uid, peer_username, last_updated })
            .collect()
    )
}

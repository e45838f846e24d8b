mod search;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::{now_ms, AppState, ChatError, ChatResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/u", get(search::search))
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Participant {
    pub uid: String,
    pub username: String,
    pub created_at: i64,
}

pub async fn by_uid(db_pool: &SqlitePool, uid: &str) -> ChatResult<Option<Participant>> {
    Ok(
        sqlx::query_as("SELECT uid,username,created_at FROM users WHERE uid=?")
            .bind(uid)
            .fetch_optional(db_pool)
            .await?
    )
}

/// Exact, case-insensitive match on the handle.
pub async fn find_by_username(db_pool: &SqlitePool, query: &str) -> ChatResult<Vec<Participant>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    Ok(
        sqlx::query_as("SELECT uid,username,created_at FROM users WHERE username=?")
            .bind(query)
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn username_taken(db_pool: &SqlitePool, username: &str) -> ChatResult<bool> {
    Ok(!find_by_username(db_pool, username).await?.is_empty())
}

/// Insert the participant record. The `UNIQUE` constraint on `username` is the
/// authority on uniqueness; a lost race surfaces as `DuplicateUsername`.
pub async fn create(db_pool: &SqlitePool, uid: &str, username: &str) -> ChatResult<Participant> {
    let result = sqlx::query_as(concat!(
        "INSERT INTO users (uid,username,created_at) VALUES (?,?,", now_ms!(), ") ",
        "RETURNING uid,username,created_at"
    ))
    .bind(uid)
    .bind(username.to_lowercase())
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(participant) => {
            log::info!("adding @{username}#{uid}");
            Ok(participant)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(ChatError::DuplicateUsername),
        Err(err) => Err(err.into()),
    }
}

use axum::{debug_handler, extract::{Query, State}, response::{IntoResponse, Redirect, Response}};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{index, session, AppResult};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    username: String,
}

#[debug_handler]
pub(crate) async fn search(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Query(SearchQuery { username }): Query<SearchQuery>,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let results = super::find_by_username(&db_pool, &username).await?;
    Ok(index::home(&db_pool, &user, Some((username.as_str(), results.as_slice()))).await?.into_response())
}

use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{chat, include_res, res, session::{self, SignedIn}, users::Participant, AppResult};

/// The chat shell: search on the left, recent conversations below it.
pub(crate) async fn home(
    db_pool: &SqlitePool,
    user: &SignedIn,
    search: Option<(&str, &[Participant])>,
) -> AppResult<Html<String>> {
    let results = match search {
        Some((_, [])) => r#"<div class="empty">No user with that name</div>"#.to_owned(),
        Some((_, found)) => found
            .iter()
            .map(|p| format!(r#"<a class="result" href="/c/{}">{}</a>"#, res::escape(&p.uid), res::escape(&p.username)))
            .collect(),
        None => String::new(),
    };

    let conversations = chat::conversations_for(db_pool, &user.uid).await?;
    let conversations: String = if conversations.is_empty() {
        r#"<div class="empty">No conversations yet</div>"#.to_owned()
    } else {
        conversations
            .iter()
            .map(|c| format!(
                r#"<a class="conversation" href="/c/{}">{}</a>"#,
                res::escape(&c.peer_uid),
                res::escape(&c.peer_username),
            ))
            .collect()
    };

    let body = include_res!(str, "/pages/index.html")
        .replace("{conversations}", &conversations)
        .replace("{results}", &results)
        .replace("{search}", &res::escape(search.map_or("", |(term, _)| term)));

    Ok(res::page("Chats", Some(user), &body))
}

#[debug_handler]
pub async fn index(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    Ok(home(&db_pool, &user, None).await?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn search_term_stays_in_its_field() {
        let db_pool = db::memory().await;
        let user = SignedIn { uid: "u1".into(), username: "alice".into() };

        let found: &[Participant] = &[];
        let Html(html) = home(&db_pool, &user, Some(("{conversations}", found))).await.unwrap();

        assert!(html.contains(r#"value="&#123;conversations&#125;""#));
        assert_eq!(html.matches("No conversations yet").count(), 1);
    }
}

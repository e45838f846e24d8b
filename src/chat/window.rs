use axum::{debug_handler, extract::{Multipart, Path, State}, http::StatusCode, response::{IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{include_res, res, session::{self, SignedIn}, users::{self, Participant}, AppResult, AppState, ChatError};

use super::{chat_id, msg::{self, Upload}};

async fn render_window(
    db_pool: &SqlitePool,
    user: &SignedIn,
    peer: &Participant,
    error: Option<&str>,
) -> AppResult<String> {
    let messages = msg::list_messages(db_pool, &chat_id(&user.uid, &peer.uid)).await?;
    let messages = msg::render_messages(messages, &user.uid, &peer.uid);

    Ok(
        include_res!(str, "/pages/chat/window.html")
            .replace("{peer}", &res::escape(&peer.username))
            .replace("{peer_uid}", &res::escape(&peer.uid))
            .replace("{error}", &res::error_line(error))
            .replace("{messages}", &messages)
    )
}

#[debug_handler]
pub(crate) async fn chat_window(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(peer_uid): Path<String>,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(peer) = users::by_uid(&db_pool, &peer_uid).await? else {
        return res::sorry("user");
    };

    let body = render_window(&db_pool, &user, &peer, None).await?;
    let title = format!("Chat with {}", peer.username);
    Ok(res::page(&title, Some(&user), &body).into_response())
}

#[debug_handler]
pub(crate) async fn send(
    State(state): State<AppState>,
    session: Session,
    Path(peer_uid): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(peer) = users::by_uid(&state.db_pool, &peer_uid).await? else {
        return res::sorry("user");
    };

    let mut text = None;
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "text" => text = Some(field.text().await?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?.to_vec();
                image = Some(Upload { file_name, content_type, bytes });
            }
            _ => {}
        }
    }

    let sent = msg::send_message(
        &state.db_pool,
        &state.feed,
        &state.blobs,
        &user.uid,
        &peer.uid,
        text.as_deref(),
        image,
    )
    .await;

    match sent {
        Ok(_) => Ok(Redirect::to(&format!("/c/{}", peer.uid)).into_response()),
        Err(err) if err.is_user_facing() => {
            let body = render_window(&state.db_pool, &user, &peer, Some(&err.to_string())).await?;
            Ok((err.status(), res::page("Chat", Some(&user), &body)).into_response())
        }
        Err(err) => {
            log::error!("send from {} to {} failed: {err:#}", user.uid, peer.uid);
            let body = render_window(&state.db_pool, &user, &peer, Some("Sending failed, try again")).await?;
            Ok((StatusCode::INTERNAL_SERVER_ERROR, res::page("Chat", Some(&user), &body)).into_response())
        }
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path((peer_uid, message_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let Some(peer) = users::by_uid(&state.db_pool, &peer_uid).await? else {
        return res::sorry("user");
    };

    let chat_id = chat_id(&user.uid, &peer.uid);
    match msg::delete_message(&state.db_pool, &state.feed, &chat_id, &user.uid, &message_id).await {
        Ok(()) => {
            log::info!("u/{} deleted {message_id} in {chat_id}", user.uid);
            Ok(Redirect::to(&format!("/c/{}", peer.uid)).into_response())
        }
        Err(err @ ChatError::Transient(_)) => Err(err.into()),
        Err(err) => {
            log::warn!("u/{} could not delete {message_id} in {chat_id}: {err}", user.uid);
            Ok((err.status(), err.to_string()).into_response())
        }
    }
}

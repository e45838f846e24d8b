use axum::{debug_handler, extract::{ws::Message as WsMessage, Path, State, WebSocketUpgrade}, response::{IntoResponse, Response}};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{live::Feed, res, session, users, AppResult, ChatError};

use super::{chat_id, msg};

/// Push the rendered message list to the browser on every change.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    Path(peer_uid): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(feed): State<Feed>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(user) = session::signed_in(&session).await? else {
        return Err(ChatError::AuthenticationFailure.into());
    };
    let Some(peer) = users::by_uid(&db_pool, &peer_uid).await? else {
        return res::sorry("user");
    };

    let chat_id = chat_id(&user.uid, &peer.uid);
    let mut subscription = feed.subscribe(&db_pool, &chat_id);

    Ok(ws.on_upgrade(move |stream| async move {
        let (mut sender, mut receiver) = stream.split();
        log::debug!("u/{} watching {}", user.uid, subscription.chat_id());

        let mut push_task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let messages = match snapshot {
                    Ok(messages) => messages,
                    Err(err) => {
                        log::error!("could not load {}: {err:#}", subscription.chat_id());
                        break;
                    }
                };
                let html = msg::render_messages(messages, &user.uid, &peer.uid);
                if sender.send(WsMessage::Text(html.into())).await.is_err() {
                    break;
                }
            }
        });

        // the browser never sends anything; reading only notices the close
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                if matches!(msg, WsMessage::Close(_)) {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut push_task => recv_task.abort(),
            _ = &mut recv_task => push_task.abort(),
        };
    }).into_response())
}

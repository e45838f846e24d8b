use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{blobs::{self, BlobStore}, include_res, live::Feed, res, ChatError, ChatResult};

use super::{chat_id, upsert_conversation};

/// A stored message. Only `deleted` ever changes after insert.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub from_uid: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    /// Unix milliseconds, assigned by the store.
    pub created_at: i64,
    /// Store insertion order. Breaks `created_at` ties.
    pub seq: i64,
    pub deleted: bool,
}

/// An image picked in the composer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn order_messages(messages: &mut [Message]) {
    messages.sort_by_key(|message| (message.created_at, message.seq));
}

/// What a viewer is allowed to see of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageView<'a> {
    Deleted {
        id: &'a str,
        mine: bool,
    },
    Visible {
        id: &'a str,
        mine: bool,
        text: Option<&'a str>,
        image_url: Option<&'a str>,
    },
}

impl<'a> MessageView<'a> {
    pub fn of(message: &'a Message, viewer_uid: &str) -> Self {
        let mine = message.from_uid == viewer_uid;
        if message.deleted {
            return MessageView::Deleted { id: &message.id, mine };
        }

        MessageView::Visible {
            id: &message.id,
            mine,
            text: message.text.as_deref(),
            image_url: message.image_url.as_deref(),
        }
    }

    pub fn to_html(&self, peer_uid: &str) -> String {
        let side = |mine: bool| if mine { "me" } else { "them" };

        match *self {
            MessageView::Deleted { id, mine } => include_res!(str, "/pages/chat/deleted.html")
                .replace("{side}", side(mine))
                .replace("{id}", &res::escape(id)),
            MessageView::Visible { id, mine, text, image_url } => {
                let delete = if mine {
                    include_res!(str, "/pages/chat/delete_button.html")
                        .replace("{peer_uid}", &res::escape(peer_uid))
                        .replace("{id}", &res::escape(id))
                } else {
                    String::new()
                };
                let image = image_url
                    .map(|url| format!(r#"<img src="{}" alt="img" class="img">"#, res::escape(url)))
                    .unwrap_or_default();
                let text = text
                    .map(|text| format!(r#"<div class="text">{}</div>"#, render_text(text)))
                    .unwrap_or_default();

                include_res!(str, "/pages/chat/message.html")
                    .replace("{side}", side(mine))
                    .replace("{id}", &res::escape(id))
                    .replace("{author}", if mine { "You" } else { "Friend" })
                    .replace("{delete}", &delete)
                    .replace("{image}", &image)
                    .replace("{text}", &text)
            }
        }
    }
}

/// Views of `messages` in display order.
pub fn view_messages<'a>(messages: &'a mut [Message], viewer_uid: &str) -> Vec<MessageView<'a>> {
    order_messages(messages);
    let messages: &'a [Message] = messages;
    messages.iter().map(|message| MessageView::of(message, viewer_uid)).collect()
}

pub fn render_messages(mut messages: Vec<Message>, viewer_uid: &str, peer_uid: &str) -> String {
    let views = view_messages(&mut messages, viewer_uid);
    views.iter().map(|view| view.to_html(peer_uid)).collect()
}

/// The text exactly as typed, escaped, with its line breaks kept.
pub fn render_text(text: &str) -> String {
    res::escape(text).replace("\r\n", "\n").replace('\n', "<br>")
}

pub async fn insert_message(
    db_pool: &SqlitePool,
    chat_id: &str,
    from_uid: &str,
    text: Option<&str>,
    image_url: Option<&str>,
) -> ChatResult<Message> {
    let id = Uuid::now_v7();
    Ok(
        sqlx::query_as(
            "INSERT INTO messages (id,chat_id,from_uid,text,image_url) VALUES (?,?,?,?,?)
             RETURNING id,chat_id,from_uid,text,image_url,created_at,seq,deleted",
        )
        .bind(id.to_string())
        .bind(chat_id)
        .bind(from_uid)
        .bind(text)
        .bind(image_url)
        .fetch_one(db_pool)
        .await?
    )
}

pub async fn list_messages(db_pool: &SqlitePool, chat_id: &str) -> ChatResult<Vec<Message>> {
    let mut messages: Vec<Message> = sqlx::query_as(
        "SELECT id,chat_id,from_uid,text,image_url,created_at,seq,deleted
         FROM messages WHERE chat_id=? ORDER BY created_at, seq",
    )
    .bind(chat_id)
    .fetch_all(db_pool)
    .await?;

    order_messages(&mut messages);
    Ok(messages)
}

async fn upload_image(blobs: &BlobStore, chat_id: &str, upload: Upload) -> ChatResult<String> {
    let is_image = upload
        .content_type
        .as_deref()
        .is_some_and(|content_type| content_type.starts_with("image/"));
    if !is_image {
        return Err(ChatError::validation("Only images can be attached"));
    }

    let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let path = format!("chat_images/{chat_id}/{millis}_{}", blobs::sanitize_file_name(&upload.file_name));
    let blob = blobs.upload(&path, &upload.bytes).await?;

    Ok(blobs.url(&blob))
}

/// Send a message from `from_uid` to `peer_uid`, uploading the image first.
///
/// Nothing is rolled back: an image stored before a failed insert stays put.
/// Once the message is stored the send counts as done, even if the
/// conversation list could not be updated.
pub async fn send_message(
    db_pool: &SqlitePool,
    feed: &Feed,
    blobs: &BlobStore,
    from_uid: &str,
    peer_uid: &str,
    text: Option<&str>,
    image: Option<Upload>,
) -> ChatResult<Message> {
    let text = text.filter(|text| !text.trim().is_empty());
    let image = image.filter(|upload| !upload.bytes.is_empty());
    if text.is_none() && image.is_none() {
        return Err(ChatError::validation("Type a message or pick an image"));
    }

    let chat_id = chat_id(from_uid, peer_uid);
    let image_url = match image {
        Some(upload) => Some(upload_image(blobs, &chat_id, upload).await?),
        None => None,
    };

    let message = insert_message(db_pool, &chat_id, from_uid, text, image_url.as_deref()).await?;
    // the message is stored; a stale conversation list is not worth a resend
    if let Err(err) = upsert_conversation(db_pool, from_uid, peer_uid).await {
        log::warn!("conversation {chat_id} not updated: {err:#}");
    }
    feed.notify(&chat_id);

    Ok(message)
}

/// Soft-delete a message. Only its author may do this; the statement itself
/// carries the ownership check.
pub async fn delete_message(
    db_pool: &SqlitePool,
    feed: &Feed,
    chat_id: &str,
    requester_uid: &str,
    message_id: &str,
) -> ChatResult<()> {
    let result = sqlx::query("UPDATE messages SET deleted=1 WHERE id=? AND chat_id=? AND from_uid=?")
        .bind(message_id)
        .bind(chat_id)
        .bind(requester_uid)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        let exists: Option<(String,)> = sqlx::query_as("SELECT from_uid FROM messages WHERE id=? AND chat_id=?")
            .bind(message_id)
            .bind(chat_id)
            .fetch_optional(db_pool)
            .await?;

        return match exists {
            Some(_) => Err(ChatError::Unauthorized),
            None => Err(ChatError::not_found("message", message_id)),
        };
    }

    feed.notify(chat_id);
    Ok(())
}

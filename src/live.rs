//! Live message lists.
//!
//! Writers call [`Feed::notify`] after every change to a conversation. Each
//! open chat window holds a [`Subscription`] that answers with the full,
//! ordered message list: once on subscribe, then again after every change.
//! Snapshots are always re-read from storage, so a slow reader that misses
//! notifications still ends on the latest state.

use std::{collections::HashMap, sync::{Arc, Mutex, PoisonError}};

use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::{RecvError, TryRecvError}};

use crate::{chat::msg::{self, Message}, ChatResult};

const CHANNEL_CAPACITY: usize = 16;

type Channels = Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>;

#[derive(Clone, Default)]
pub struct Feed {
    channels: Channels,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell every subscriber of `chat_id` that its message list changed.
    pub fn notify(&self, chat_id: &str) {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = channels.get(chat_id) {
            let _ = tx.send(());
        }
    }

    pub fn subscriber_count(&self, chat_id: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.get(chat_id).map_or(0, broadcast::Sender::receiver_count)
    }

    /// Start watching a conversation. The subscription is released when dropped.
    pub fn subscribe(&self, db_pool: &SqlitePool, chat_id: &str) -> Subscription {
        let rx = {
            let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            channels
                .entry(chat_id.to_owned())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        Subscription {
            channels: self.channels.clone(),
            db_pool: db_pool.clone(),
            chat_id: chat_id.to_owned(),
            rx: Some(rx),
            primed: false,
        }
    }

    fn release(channels: &Channels, chat_id: &str) {
        let mut channels = channels.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = channels
            .get(chat_id)
            .is_some_and(|tx| tx.receiver_count() == 0);
        if idle {
            channels.remove(chat_id);
        }
    }
}

pub struct Subscription {
    channels: Channels,
    db_pool: SqlitePool,
    chat_id: String,
    rx: Option<broadcast::Receiver<()>>,
    primed: bool,
}

impl Subscription {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// The next full snapshot, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChatResult<Vec<Message>>> {
        if !self.primed {
            self.primed = true;
            return Some(self.snapshot().await);
        }

        let rx = self.rx.as_mut()?;
        match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return None,
        }
        // coalesce a burst of changes into one read
        loop {
            match rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => return None,
            }
        }

        Some(self.snapshot().await)
    }

    async fn snapshot(&self) -> ChatResult<Vec<Message>> {
        msg::list_messages(&self.db_pool, &self.chat_id).await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.rx.take());
        Feed::release(&self.channels, &self.chat_id);
    }
}

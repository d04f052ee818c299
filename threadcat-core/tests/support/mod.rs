//! Shared fixtures for core integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use threadcat_core::remote::{
    Attachment, ChatSource, HistoryOrder, HistoryQuery, HistoryStream, RemoteError, RemoteMessage,
    ServiceAction, TopicEntry,
};
use threadcat_model::{AlbumId, ChatId, MessageId, TopicId};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const CHAT: ChatId = ChatId(-1001234567890);
pub const OTHER_CHAT: ChatId = ChatId(-1009876543210);

pub fn posted_at(id: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + id * 60, 0).expect("valid timestamp")
}

/// Message posted in `topic`; the default thread carries no reply context.
pub fn message_in(id: i64, topic: i64) -> RemoteMessage {
    let message = RemoteMessage::new(MessageId(id), posted_at(id));
    if topic <= 1 {
        message
    } else {
        message.in_thread(MessageId(topic))
    }
}

pub fn video_in(id: i64, topic: i64) -> RemoteMessage {
    message_in(id, topic).with_attachment(Attachment::Document {
        mime_type: Some("video/mp4".into()),
        extension: Some(".mp4".into()),
    })
}

pub fn photo_in(id: i64, topic: i64) -> RemoteMessage {
    message_in(id, topic).with_attachment(Attachment::Photo)
}

/// Holds one full-history walk open until released.
#[derive(Debug, Default)]
pub struct WalkGate {
    entered: Notify,
    released: Notify,
}

impl WalkGate {
    /// Resolves once the gated walk is waiting on the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.released.notified().await;
    }
}

#[derive(Debug, Default)]
struct FakeChat {
    title: String,
    topics: BTreeMap<TopicId, String>,
    messages: BTreeMap<MessageId, RemoteMessage>,
    listing_fails: bool,
    title_fails: bool,
    history_fails_after: Option<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    full_walk_gate: Option<Arc<WalkGate>>,
    listing_calls: usize,
    history_calls: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    chats: HashMap<ChatId, FakeChat>,
    handles: HashMap<String, (ChatId, String)>,
    deleted: Vec<(ChatId, Vec<MessageId>)>,
    delete_fails: bool,
}

/// Scriptable in-memory [`ChatSource`].
#[derive(Debug, Default)]
pub struct FakeChatSource {
    state: Mutex<FakeState>,
}

impl FakeChatSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_chat<T>(&self, chat: ChatId, f: impl FnOnce(&mut FakeChat) -> T) -> T {
        let mut state = self.state.lock().expect("fake state lock");
        f(state.chats.entry(chat).or_default())
    }

    pub fn add_chat(&self, chat: ChatId, title: &str) {
        self.with_chat(chat, |c| c.title = title.to_string());
    }

    pub fn set_topic(&self, chat: ChatId, topic: i64, title: &str) {
        self.with_chat(chat, |c| {
            c.topics.insert(TopicId(topic), title.to_string());
        });
    }

    pub fn hide_topic(&self, chat: ChatId, topic: i64) {
        self.with_chat(chat, |c| {
            c.topics.remove(&TopicId(topic));
        });
    }

    pub fn push(&self, chat: ChatId, message: RemoteMessage) {
        self.with_chat(chat, |c| {
            c.messages.insert(message.id, message);
        });
    }

    pub fn push_album(&self, chat: ChatId, album: i64, ids: &[i64], topic: i64) {
        for id in ids {
            self.push(chat, photo_in(*id, topic).in_album(AlbumId(album)));
        }
    }

    /// Thread-creation service event, as the history fallback sees it.
    pub fn push_topic_created(&self, chat: ChatId, id: i64, topic: i64, title: &str) {
        self.push(
            chat,
            RemoteMessage::new(MessageId(id), posted_at(id)).with_service(
                ServiceAction::TopicCreated {
                    topic_id: TopicId(topic),
                    title: title.to_string(),
                },
            ),
        );
    }

    pub fn delete_remote(&self, chat: ChatId, id: i64) {
        self.with_chat(chat, |c| {
            c.messages.remove(&MessageId(id));
        });
    }

    pub fn fail_listing(&self, chat: ChatId, fails: bool) {
        self.with_chat(chat, |c| c.listing_fails = fails);
    }

    pub fn fail_title(&self, chat: ChatId, fails: bool) {
        self.with_chat(chat, |c| c.title_fails = fails);
    }

    /// Yields `n` messages, then a history error.
    pub fn fail_history_after(&self, chat: ChatId, n: Option<usize>) {
        self.with_chat(chat, |c| c.history_fails_after = n);
    }

    /// Cancels `token` once `n` messages have been yielded.
    pub fn cancel_after(&self, chat: ChatId, n: usize, token: CancellationToken) {
        self.with_chat(chat, |c| c.cancel_after = Some((n, token)));
    }

    /// Gates the next full-history walk of `chat`. The walk's snapshot of
    /// messages is taken before it blocks.
    pub fn gate_full_walk(&self, chat: ChatId) -> Arc<WalkGate> {
        let gate = Arc::new(WalkGate::default());
        self.with_chat(chat, |c| c.full_walk_gate = Some(Arc::clone(&gate)));
        gate
    }

    pub fn register_handle(&self, handle: &str, chat: ChatId, title: &str) {
        let mut state = self.state.lock().expect("fake state lock");
        state
            .handles
            .insert(handle.to_string(), (chat, title.to_string()));
    }

    pub fn fail_deletes(&self, fails: bool) {
        self.state.lock().expect("fake state lock").delete_fails = fails;
    }

    pub fn deleted(&self) -> Vec<(ChatId, Vec<MessageId>)> {
        self.state.lock().expect("fake state lock").deleted.clone()
    }

    pub fn listing_calls(&self, chat: ChatId) -> usize {
        self.with_chat(chat, |c| c.listing_calls)
    }

    pub fn history_calls(&self, chat: ChatId) -> usize {
        self.with_chat(chat, |c| c.history_calls)
    }
}

#[async_trait]
impl ChatSource for FakeChatSource {
    async fn chat_title(&self, chat: ChatId) -> Result<String, RemoteError> {
        let mut state = self.state.lock().expect("fake state lock");
        match state.chats.get_mut(&chat) {
            Some(c) if !c.title_fails => Ok(c.title.clone()),
            _ => Err(RemoteError::Lookup(format!("no title for {chat}"))),
        }
    }

    async fn list_topics(
        &self,
        chat: ChatId,
        offset: Option<TopicId>,
        limit: usize,
    ) -> Result<Vec<TopicEntry>, RemoteError> {
        self.with_chat(chat, |c| {
            c.listing_calls += 1;
            if c.listing_fails {
                return Err(RemoteError::Listing(format!("listing unavailable for {chat}")));
            }
            Ok(c.topics
                .iter()
                .filter(|(id, _)| offset.is_none_or(|after| **id > after))
                .take(limit)
                .map(|(id, title)| TopicEntry::new(*id, title.clone()))
                .collect())
        })
    }

    fn history(&self, chat: ChatId, query: HistoryQuery) -> HistoryStream<'_> {
        let (items, cancel, gate) = self.with_chat(chat, |c| {
            c.history_calls += 1;
            let mut messages: Vec<RemoteMessage> = c
                .messages
                .values()
                .filter(|m| query.min_id.is_none_or(|min| m.id > min))
                .cloned()
                .collect();
            if query.order == HistoryOrder::NewestFirst {
                messages.reverse();
            }
            let mut items: Vec<Result<RemoteMessage, RemoteError>> =
                messages.into_iter().map(Ok).collect();
            if let Some(n) = c.history_fails_after {
                items.truncate(n);
                items.push(Err(RemoteError::History(format!("history broke for {chat}"))));
            }
            let gate = if query.min_id.is_none() {
                c.full_walk_gate.take()
            } else {
                None
            };
            (items, c.cancel_after.clone(), gate)
        });

        let items = futures::stream::iter(items.into_iter().enumerate()).map(move |(pos, item)| {
            if let Some((n, token)) = &cancel
                && pos + 1 >= *n
            {
                token.cancel();
            }
            item
        });
        match gate {
            Some(gate) => futures::stream::once(async move {
                gate.pass().await;
                items
            })
            .flatten()
            .boxed(),
            None => items.boxed(),
        }
    }

    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().expect("fake state lock");
        if state.delete_fails {
            return Err(RemoteError::Delete(format!("delete refused in {chat}")));
        }
        state.deleted.push((chat, ids.to_vec()));
        if let Some(c) = state.chats.get_mut(&chat) {
            for id in ids {
                c.messages.remove(id);
            }
        }
        Ok(())
    }

    async fn resolve_handle(&self, handle: &str) -> Result<(ChatId, String), RemoteError> {
        self.state
            .lock()
            .expect("fake state lock")
            .handles
            .get(handle)
            .cloned()
            .ok_or_else(|| RemoteError::Lookup(format!("unknown handle {handle}")))
    }
}

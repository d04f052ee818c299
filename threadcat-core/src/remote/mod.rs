//! Contract with the remote chat-history collaborator.
//!
//! Transport, authentication and rate limiting live behind [`ChatSource`];
//! the engine only ever sees paged topic listings, ordered history streams
//! and a best-effort delete call.

mod message;

pub use message::{Attachment, RemoteMessage, ReplyContext, ServiceAction};

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use threadcat_model::{ChatId, MessageId, TopicId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("topic listing failed: {0}")]
    Listing(String),

    #[error("history read failed: {0}")]
    History(String),

    #[error("chat lookup failed: {0}")]
    Lookup(String),

    #[error("delete failed: {0}")]
    Delete(String),
}

/// One `(id, title)` pair from the paged thread listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub id: TopicId,
    pub title: String,
}

impl TopicEntry {
    pub fn new(id: TopicId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrder {
    OldestFirst,
    NewestFirst,
}

/// Bounds and direction of a history walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only messages with an id strictly greater than this are yielded.
    pub min_id: Option<MessageId>,
    pub order: HistoryOrder,
}

impl HistoryQuery {
    /// Oldest-to-newest walk of everything after `cursor`.
    pub fn after(cursor: MessageId) -> Self {
        Self {
            min_id: Some(cursor),
            order: HistoryOrder::OldestFirst,
        }
    }

    /// Unbounded walk of the whole history, newest first.
    pub fn full() -> Self {
        Self {
            min_id: None,
            order: HistoryOrder::NewestFirst,
        }
    }
}

pub type HistoryStream<'a> =
    BoxStream<'a, std::result::Result<RemoteMessage, RemoteError>>;

/// Remote chat-history collaborator.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Current display name of the chat.
    async fn chat_title(&self, chat: ChatId) -> Result<String, RemoteError>;

    /// One page of the thread listing, ordered by topic id.
    ///
    /// `offset` is the last topic id of the previous page (`None` for the
    /// first page). A page shorter than `limit` is the last one.
    async fn list_topics(
        &self,
        chat: ChatId,
        offset: Option<TopicId>,
        limit: usize,
    ) -> Result<Vec<TopicEntry>, RemoteError>;

    /// Paged history iteration; pages are fetched lazily as the stream is
    /// polled.
    fn history(&self, chat: ChatId, query: HistoryQuery) -> HistoryStream<'_>;

    async fn delete_messages(
        &self,
        chat: ChatId,
        ids: &[MessageId],
    ) -> Result<(), RemoteError>;

    /// Resolves a public chat handle to its id and title.
    async fn resolve_handle(
        &self,
        handle: &str,
    ) -> Result<(ChatId, String), RemoteError>;
}

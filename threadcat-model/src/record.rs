use chrono::{DateTime, Utc};

use crate::ids::{AlbumId, ChatId, MessageId, TopicId};
use crate::taxonomy::TopicKey;

/// Kind of media attachment tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// Identity of a record for dedup and removal: `(chat, message)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl RecordKey {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// One media attachment living in a remote chat.
///
/// Chat and topic names are denormalized copies; only reconciliation
/// rewrites them. The serialized field names follow the on-disk catalog
/// format.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaRecord {
    #[cfg_attr(feature = "serde", serde(rename = "group"))]
    pub chat_title: String,
    #[cfg_attr(feature = "serde", serde(rename = "group_id"))]
    pub chat_id: ChatId,
    #[cfg_attr(feature = "serde", serde(rename = "topic"))]
    pub topic_id: TopicId,
    pub topic_name: String,
    #[cfg_attr(feature = "serde", serde(rename = "msg_id"))]
    pub message_id: MessageId,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "grouped_id", default)
    )]
    pub album_id: Option<AlbumId>,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: MediaKind,
    #[cfg_attr(feature = "serde", serde(rename = "ext", default))]
    pub extension: String,
    #[cfg_attr(feature = "serde", serde(rename = "date"))]
    pub posted_at: DateTime<Utc>,
}

impl MediaRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.chat_id, self.message_id)
    }

    /// Composite `(chat, topic)` key this record is indexed under.
    pub fn topic_key(&self) -> TopicKey {
        TopicKey::new(self.chat_id, self.topic_id)
    }
}

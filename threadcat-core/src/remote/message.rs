use chrono::{DateTime, Utc};
use threadcat_model::{AlbumId, MessageId, TopicId};

/// Reply metadata attached to a message posted inside a thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyContext {
    /// Id of the thread's top-level message, when the remote reports it.
    pub top_id: Option<MessageId>,
    /// Id of the message this one replies to directly.
    pub reply_to: Option<MessageId>,
}

/// Media payload carried by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Photo,
    Video,
    Document {
        mime_type: Option<String>,
        /// Extension including the leading dot, e.g. `".mp4"`.
        extension: Option<String>,
    },
}

/// Service events the resolver cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAction {
    TopicCreated { topic_id: TopicId, title: String },
}

/// One message yielded by remote history iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMessage {
    pub id: MessageId,
    pub reply: Option<ReplyContext>,
    pub attachment: Option<Attachment>,
    pub service: Option<ServiceAction>,
    pub posted_at: DateTime<Utc>,
    pub album_id: Option<AlbumId>,
}

impl RemoteMessage {
    pub fn new(id: MessageId, posted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            reply: None,
            attachment: None,
            service: None,
            posted_at,
            album_id: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Marks the message as posted in the thread rooted at `top`.
    pub fn in_thread(mut self, top: MessageId) -> Self {
        self.reply = Some(ReplyContext {
            top_id: Some(top),
            reply_to: Some(top),
        });
        self
    }

    pub fn with_reply(mut self, reply: ReplyContext) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn in_album(mut self, album: AlbumId) -> Self {
        self.album_id = Some(album);
        self
    }

    pub fn with_service(mut self, action: ServiceAction) -> Self {
        self.service = Some(action);
        self
    }

    /// Topic this message belongs to.
    ///
    /// The thread's top-level id wins over the immediate parent unless it is
    /// `0`; messages without reply context (or resolving to `0`) live in the
    /// default thread `1`.
    pub fn topic_id(&self) -> TopicId {
        let raw = self
            .reply
            .and_then(|reply| {
                reply
                    .top_id
                    .filter(|id| id.as_i64() != 0)
                    .or(reply.reply_to)
            })
            .map(|id| id.as_i64())
            .unwrap_or(0);
        TopicId(raw).canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: i64) -> RemoteMessage {
        RemoteMessage::new(MessageId(id), Utc::now())
    }

    #[test]
    fn top_level_id_wins_over_parent() {
        let message = msg(20).with_reply(ReplyContext {
            top_id: Some(MessageId(5)),
            reply_to: Some(MessageId(18)),
        });
        assert_eq!(message.topic_id(), TopicId(5));
    }

    #[test]
    fn parent_is_used_when_top_level_missing() {
        let message = msg(20).with_reply(ReplyContext {
            top_id: None,
            reply_to: Some(MessageId(18)),
        });
        assert_eq!(message.topic_id(), TopicId(18));
    }

    #[test]
    fn messages_without_thread_land_in_general() {
        assert_eq!(msg(3).topic_id(), TopicId::GENERAL);
        let zero = msg(4).with_reply(ReplyContext {
            top_id: Some(MessageId(0)),
            reply_to: None,
        });
        assert_eq!(zero.topic_id(), TopicId::GENERAL);
    }

    #[test]
    fn zero_top_level_id_falls_through_to_parent() {
        let message = msg(21).with_reply(ReplyContext {
            top_id: Some(MessageId(0)),
            reply_to: Some(MessageId(7)),
        });
        assert_eq!(message.topic_id(), TopicId(7));
    }
}

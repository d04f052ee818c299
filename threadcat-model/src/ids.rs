use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Prefix the remote system puts in front of supergroup ids.
const SUPERGROUP_PREFIX: &str = "-100";

/// Stable identifier of a remote group conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Builds the supergroup id from the bare numeric part of a private link
    /// (`t.me/c/<digits>/..`).
    pub fn from_private_link_part(digits: &str) -> Result<Self, ModelError> {
        format!("{SUPERGROUP_PREFIX}{digits}").parse()
    }

    /// The id with the supergroup prefix removed, as used in private links.
    pub fn link_part(&self) -> String {
        let raw = self.0.to_string();
        raw.strip_prefix(SUPERGROUP_PREFIX)
            .map(str::to_string)
            .unwrap_or(raw)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| ModelError::InvalidId(format!("chat id `{s}`")))
    }
}

/// Identifier of a topic thread inside a chat.
///
/// Ids `0` and `1` both denote the default thread. Records always carry the
/// canonical form `1`; `0` only ever appears as a runtime alias in resolved
/// topic maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TopicId(pub i64);

impl TopicId {
    /// Runtime-only alias for the default thread.
    pub const ALIAS: TopicId = TopicId(0);
    /// Canonical id of the default thread.
    pub const GENERAL: TopicId = TopicId(1);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn is_general(&self) -> bool {
        *self == Self::ALIAS || *self == Self::GENERAL
    }

    /// Folds the `0` alias onto the canonical default thread id.
    pub fn canonical(self) -> Self {
        if self == Self::ALIAS { Self::GENERAL } else { self }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TopicId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(TopicId)
            .map_err(|_| ModelError::InvalidId(format!("topic id `{s}`")))
    }
}

/// Message id, unique within a chat and assigned monotonically by the remote.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared id linking the sibling attachments of one multi-item post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AlbumId(pub i64);

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_link_part_round_trips_supergroup_prefix() {
        let chat = ChatId::from_private_link_part("1234567").unwrap();
        assert_eq!(chat, ChatId(-1001234567));
        assert_eq!(chat.link_part(), "1234567");
    }

    #[test]
    fn link_part_leaves_plain_ids_alone() {
        assert_eq!(ChatId(42).link_part(), "42");
    }

    #[test]
    fn topic_alias_folds_onto_general() {
        assert_eq!(TopicId(0).canonical(), TopicId::GENERAL);
        assert_eq!(TopicId(7).canonical(), TopicId(7));
        assert!(TopicId(0).is_general());
        assert!(TopicId(1).is_general());
        assert!(!TopicId(5).is_general());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("abc".parse::<ChatId>().is_err());
        assert_eq!(" 12 ".parse::<TopicId>().unwrap(), TopicId(12));
    }
}

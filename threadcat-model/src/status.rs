use std::collections::BTreeMap;

use crate::ids::{ChatId, MessageId, TopicId};

/// Topic id to display name map for one chat.
///
/// Resolved maps handed to callers carry the runtime alias `0`; the
/// persisted copy never does (see [`TopicMap::without_alias`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TopicMap(BTreeMap<TopicId, String>);

impl TopicMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: TopicId) -> Option<&str> {
        self.0.get(&topic).map(String::as_str)
    }

    pub fn contains(&self, topic: TopicId) -> bool {
        self.0.contains_key(&topic)
    }

    pub fn insert(
        &mut self,
        topic: TopicId,
        name: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(topic, name.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TopicId, &str)> + '_ {
        self.0.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn topic_ids(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.0.keys().copied()
    }

    /// Overlays `other` on top of this map; names from `other` win.
    pub fn merge(&mut self, other: TopicMap) {
        self.0.extend(other.0);
    }

    /// Name for `topic`, or the `"<prefix> (<id>)"` placeholder.
    pub fn name_or_placeholder(&self, topic: TopicId, prefix: &str) -> String {
        self.get(topic)
            .map(str::to_string)
            .unwrap_or_else(|| unknown_topic_label(prefix, topic))
    }

    /// Adds the runtime alias `0` for the default thread.
    ///
    /// The alias copies the name of topic `1`; when `1` is missing both
    /// entries receive `default_label`.
    pub fn with_alias(mut self, default_label: &str) -> Self {
        match self.0.get(&TopicId::GENERAL).cloned() {
            Some(general) => {
                self.0.insert(TopicId::ALIAS, general);
            }
            None => {
                self.0.insert(TopicId::ALIAS, default_label.to_string());
                self.0.insert(TopicId::GENERAL, default_label.to_string());
            }
        }
        self
    }

    /// Copy of the map without the derivable `0` alias, ready to persist.
    pub fn without_alias(&self) -> Self {
        let mut stripped = self.clone();
        stripped.0.remove(&TopicId::ALIAS);
        stripped
    }
}

impl FromIterator<(TopicId, String)> for TopicMap {
    fn from_iter<I: IntoIterator<Item = (TopicId, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Placeholder label for a topic whose name could not be resolved.
pub fn unknown_topic_label(prefix: &str, topic: TopicId) -> String {
    format!("{prefix} ({topic})")
}

/// Highest message id seen per topic ("activity").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ActivityTable(BTreeMap<TopicId, MessageId>);

impl ActivityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, topic: TopicId) -> Option<MessageId> {
        self.0.get(&topic).copied()
    }

    /// Raises the entry for `topic` to `message` if it is newer.
    pub fn touch(&mut self, topic: TopicId, message: MessageId) {
        let entry = self.0.entry(topic).or_default();
        if message > *entry {
            *entry = message;
        }
    }

    pub fn retain_topics(&mut self, mut keep: impl FnMut(TopicId) -> bool) {
        self.0.retain(|topic, _| keep(*topic));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TopicId, MessageId)> + '_ {
        self.0.iter().map(|(topic, id)| (*topic, *id))
    }
}

/// Synchronization bookkeeping for one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SyncStatus {
    /// Chat display name.
    pub title: String,
    /// Highest message id processed by incremental scanning.
    pub last_id: MessageId,
    pub topic_map: TopicMap,
    pub topic_last_ids: ActivityTable,
}

impl SyncStatus {
    pub fn registered(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// The persisted sync status document, one entry per source chat.
pub type SyncStatusTable = BTreeMap<ChatId, SyncStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_copies_general_name() {
        let map: TopicMap =
            [(TopicId(1), "Lobby".to_string())].into_iter().collect();
        let aliased = map.with_alias("General");
        assert_eq!(aliased.get(TopicId(0)), Some("Lobby"));
        assert_eq!(aliased.get(TopicId(1)), Some("Lobby"));
    }

    #[test]
    fn alias_defaults_both_entries_when_general_missing() {
        let map: TopicMap =
            [(TopicId(5), "Clips".to_string())].into_iter().collect();
        let aliased = map.with_alias("General");
        assert_eq!(aliased.get(TopicId(0)), Some("General"));
        assert_eq!(aliased.get(TopicId(1)), Some("General"));
        assert_eq!(aliased.get(TopicId(5)), Some("Clips"));
    }

    #[test]
    fn stripped_map_never_contains_alias() {
        let aliased = TopicMap::new().with_alias("General");
        let stripped = aliased.without_alias();
        assert!(!stripped.contains(TopicId::ALIAS));
        assert!(stripped.contains(TopicId::GENERAL));
    }

    #[test]
    fn activity_only_moves_forward() {
        let mut activity = ActivityTable::new();
        activity.touch(TopicId(5), MessageId(12));
        activity.touch(TopicId(5), MessageId(10));
        assert_eq!(activity.get(TopicId(5)), Some(MessageId(12)));
    }

    #[test]
    fn placeholder_names_carry_the_id() {
        let map = TopicMap::new();
        assert_eq!(map.name_or_placeholder(TopicId(9), "Unknown"), "Unknown (9)");
    }
}

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{ChatId, TopicId};

/// Delimiter that starts an inline annotation inside a taxonomy key.
pub const COMMENT_DELIMITER: &str = "//";

/// Composite `(chat, topic)` key linking the taxonomy to indexed records.
///
/// Written as `"<chat-id>:<topic-id>"`. Topic `0` is folded onto `1` when
/// parsed so both spellings of the default thread address the same records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicKey {
    pub chat_id: ChatId,
    pub topic_id: TopicId,
}

impl TopicKey {
    pub fn new(chat_id: ChatId, topic_id: TopicId) -> Self {
        Self {
            chat_id,
            topic_id: topic_id.canonical(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.topic_id)
    }
}

impl FromStr for TopicKey {
    type Err = ModelError;

    /// Parses a key, ignoring anything after the comment delimiter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = strip_annotation(s);
        let (chat, topic) = clean
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidTopicKey(s.to_string()))?;
        let chat = chat
            .parse::<ChatId>()
            .map_err(|_| ModelError::InvalidTopicKey(s.to_string()))?;
        let topic = topic
            .parse::<TopicId>()
            .map_err(|_| ModelError::InvalidTopicKey(s.to_string()))?;
        Ok(TopicKey::new(chat, topic))
    }
}

/// Drops the inline annotation (`"-100123:5 // clips"` -> `"-100123:5"`).
pub fn strip_annotation(raw: &str) -> &str {
    raw.split(COMMENT_DELIMITER).next().unwrap_or(raw).trim()
}

/// On-disk shape of the tag taxonomy document.
pub type RawTaxonomy = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Two-level tag taxonomy: major category -> minor category -> keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTaxonomy {
    majors: BTreeMap<String, BTreeMap<String, Vec<TopicKey>>>,
}

impl TagTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the taxonomy from its raw document form.
    ///
    /// Keys that fail to parse are skipped and returned alongside so callers
    /// can report them.
    pub fn from_raw(raw: RawTaxonomy) -> (Self, Vec<ModelError>) {
        let mut rejected = Vec::new();
        let mut majors = BTreeMap::new();
        for (major, minors) in raw {
            let mut parsed_minors = BTreeMap::new();
            for (minor, keys) in minors {
                let parsed = keys
                    .iter()
                    .filter_map(|key| match key.parse::<TopicKey>() {
                        Ok(parsed) => Some(parsed),
                        Err(err) => {
                            rejected.push(err);
                            None
                        }
                    })
                    .collect();
                parsed_minors.insert(minor, parsed);
            }
            majors.insert(major, parsed_minors);
        }
        (Self { majors }, rejected)
    }

    /// Adds (or replaces) a minor category.
    pub fn insert(
        &mut self,
        major: impl Into<String>,
        minor: impl Into<String>,
        keys: Vec<TopicKey>,
    ) {
        self.majors
            .entry(major.into())
            .or_default()
            .insert(minor.into(), keys);
    }

    pub fn majors(&self) -> impl Iterator<Item = &str> + '_ {
        self.majors.keys().map(String::as_str)
    }

    pub fn minors(&self, major: &str) -> impl Iterator<Item = &str> + '_ {
        self.majors
            .get(major)
            .into_iter()
            .flat_map(|minors| minors.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.majors.is_empty()
    }

    /// Every composite key listed under a tag node, in document order and
    /// with repeats: one minor category, or every minor under `major` when
    /// `minor` is `None`.
    pub fn listed_keys(&self, major: &str, minor: Option<&str>) -> Vec<TopicKey> {
        let Some(minors) = self.majors.get(major) else {
            return Vec::new();
        };
        match minor {
            Some(minor) => minors.get(minor).cloned().unwrap_or_default(),
            None => minors.values().flatten().copied().collect(),
        }
    }

    /// Like [`listed_keys`](Self::listed_keys) but de-duplicated, first
    /// occurrence wins.
    pub fn keys_for(&self, major: &str, minor: Option<&str>) -> Vec<TopicKey> {
        let mut seen = HashSet::new();
        self.listed_keys(major, minor)
            .into_iter()
            .filter(|key| seen.insert(*key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, &str, &[&str])]) -> RawTaxonomy {
        let mut raw = RawTaxonomy::new();
        for (major, minor, keys) in entries {
            raw.entry(major.to_string()).or_default().insert(
                minor.to_string(),
                keys.iter().map(|k| k.to_string()).collect(),
            );
        }
        raw
    }

    #[test]
    fn annotations_are_stripped_before_parsing() {
        let key: TopicKey = "-100123:5 // highlight reel".parse().unwrap();
        assert_eq!(key, TopicKey::new(ChatId(-100123), TopicId(5)));
    }

    #[test]
    fn default_thread_spellings_share_a_key() {
        let zero: TopicKey = "-100123:0".parse().unwrap();
        let one: TopicKey = "-100123:1".parse().unwrap();
        assert_eq!(zero, one);
    }

    #[test]
    fn malformed_keys_are_reported_and_skipped() {
        let (taxonomy, rejected) = TagTaxonomy::from_raw(raw(&[(
            "Sports",
            "Clips",
            &["-100123:5", "nonsense"],
        )]));
        assert_eq!(rejected.len(), 1);
        assert_eq!(taxonomy.keys_for("Sports", Some("Clips")).len(), 1);
    }

    #[test]
    fn major_level_lookup_unions_minors_without_duplicates() {
        let (taxonomy, _) = TagTaxonomy::from_raw(raw(&[
            ("Sports", "Clips", &["1:5", "1:6"]),
            ("Sports", "Goals", &["1:6", "2:1"]),
        ]));
        let keys = taxonomy.keys_for("Sports", None);
        assert_eq!(keys.len(), 3);
        assert!(taxonomy.keys_for("Missing", None).is_empty());
        assert!(taxonomy.keys_for("Sports", Some("Missing")).is_empty());
    }

    #[test]
    fn listed_keys_keep_repeats_across_minors() {
        let (taxonomy, _) = TagTaxonomy::from_raw(raw(&[
            ("Sports", "Clips", &["1:5", "1:6"]),
            ("Sports", "Goals", &["1:6", "2:1"]),
        ]));
        assert_eq!(taxonomy.listed_keys("Sports", None).len(), 4);
        assert_eq!(taxonomy.listed_keys("Sports", Some("Goals")).len(), 2);
        assert!(taxonomy.listed_keys("Missing", None).is_empty());
    }
}

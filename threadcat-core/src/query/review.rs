//! Per-chat topic activity overview.

use std::collections::{BTreeSet, HashMap};

use threadcat_model::{ChatId, MediaRecord, MessageId, SyncStatusTable, TopicId};

/// Ordering of topics inside a chat column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewSort {
    /// Most recently active first.
    #[default]
    Latest,
    /// Most records first, ties broken by recency.
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicActivity {
    pub topic_id: TopicId,
    pub name: String,
    /// Highest message id seen in the topic; zero when never scanned.
    pub last_active: MessageId,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatActivity {
    pub chat_id: ChatId,
    pub title: String,
    pub topics: Vec<TopicActivity>,
}

/// Label for topics that appear in the activity table but have no name.
pub const UNNAMED_TOPIC: &str = "Unknown";

/// One column per tracked chat listing every known topic.
///
/// Known topics are the union of the persisted topic map and the activity
/// table, excluding the runtime alias `0`.
pub fn activity_review(
    status: &SyncStatusTable,
    catalog: &[MediaRecord],
    sort: ReviewSort,
) -> Vec<ChatActivity> {
    let mut counts: HashMap<(ChatId, TopicId), usize> = HashMap::new();
    for record in catalog {
        *counts
            .entry((record.chat_id, record.topic_id.canonical()))
            .or_insert(0) += 1;
    }

    status
        .iter()
        .map(|(chat_id, status)| {
            let known: BTreeSet<TopicId> = status
                .topic_map
                .topic_ids()
                .chain(status.topic_last_ids.iter().map(|(topic, _)| topic))
                .filter(|topic| *topic != TopicId::ALIAS)
                .collect();

            let mut topics: Vec<TopicActivity> = known
                .into_iter()
                .map(|topic_id| TopicActivity {
                    topic_id,
                    name: status
                        .topic_map
                        .get(topic_id)
                        .unwrap_or(UNNAMED_TOPIC)
                        .to_string(),
                    last_active: status.topic_last_ids.get(topic_id).unwrap_or_default(),
                    records: counts.get(&(*chat_id, topic_id)).copied().unwrap_or(0),
                })
                .collect();

            match sort {
                ReviewSort::Latest => {
                    topics.sort_by(|a, b| b.last_active.cmp(&a.last_active));
                }
                ReviewSort::Count => {
                    topics.sort_by(|a, b| {
                        (b.records, b.last_active).cmp(&(a.records, a.last_active))
                    });
                }
            }

            ChatActivity {
                chat_id: *chat_id,
                title: if status.title.is_empty() {
                    format!("Group {chat_id}")
                } else {
                    status.title.clone()
                },
                topics,
            }
        })
        .collect()
}

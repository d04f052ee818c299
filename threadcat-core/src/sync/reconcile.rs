use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use threadcat_model::{ChatId, MediaRecord, MessageId, TopicId, TopicMap};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::settings::SyncSettings;
use super::topics::TopicResolver;
use super::{TopicTally, current_title, next_message};
use crate::error::Result;
use crate::remote::{ChatSource, HistoryQuery};
use crate::store::{JsonStore, ReconciledChat};

/// A topic label change observed during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRename {
    pub from: String,
    pub to: String,
}

/// What one reconciliation pass corrected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub chat_id: ChatId,
    pub chat_title: String,
    /// Records whose message no longer exists remotely.
    pub removed: usize,
    /// Retained records whose topic label changed.
    pub relabeled: usize,
    pub favorites_dropped: usize,
    pub removed_per_topic: BTreeMap<TopicId, TopicTally>,
    /// First observed rename per topic.
    pub renames: BTreeMap<TopicId, TopicRename>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.removed == 0 && self.relabeled == 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{}: in sync", self.chat_title);
        }
        write!(
            f,
            "{}: removed {}, relabeled {}",
            self.chat_title, self.removed, self.relabeled
        )?;
        for tally in self.removed_per_topic.values() {
            write!(f, "\n  {}: -{}", tally.name, tally.count)?;
        }
        for rename in self.renames.values() {
            write!(f, "\n  {} -> {}", rename.from, rename.to)?;
        }
        Ok(())
    }
}

/// Re-derives a chat's catalog partition from its complete remote history.
///
/// Removes records whose message is gone, relabels renamed topics and
/// rebuilds the topic map and activity table. The cursor is never read or
/// written.
pub(crate) struct Reconciler<'a> {
    source: &'a dyn ChatSource,
    store: &'a JsonStore,
    settings: &'a SyncSettings,
}

impl fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", self.store)
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        source: &'a dyn ChatSource,
        store: &'a JsonStore,
        settings: &'a SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    pub(crate) async fn reconcile(
        &self,
        chat_id: ChatId,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport> {
        let status = self.store.status(chat_id).await.unwrap_or_default();
        let previous = &status.topic_map;
        let title = current_title(self.source, chat_id, &status.title).await;
        let topics = TopicResolver::new(self.source, self.settings)
            .resolve_live(chat_id, previous, cancel)
            .await?;

        let mut records: Vec<MediaRecord> = self
            .store
            .catalog()
            .await
            .into_iter()
            .filter(|record| record.chat_id == chat_id)
            .collect();
        let mut by_message: HashMap<MessageId, Vec<usize>> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            by_message.entry(record.message_id).or_default().push(pos);
        }
        let mut seen = vec![false; records.len()];

        let mut relabeled = 0;
        let mut renames: BTreeMap<TopicId, TopicRename> = BTreeMap::new();
        let mut history = self.source.history(chat_id, HistoryQuery::full());
        while let Some(message) = next_message(&mut history, cancel, chat_id).await? {
            let Some(positions) = by_message.get(&message.id) else {
                continue;
            };
            let topic = message.topic_id();
            let name = self.topic_name(&topics, previous, topic);
            for &pos in positions {
                seen[pos] = true;
                let record = &mut records[pos];
                if record.topic_name != name {
                    relabeled += 1;
                    renames.entry(topic).or_insert_with(|| TopicRename {
                        from: record.topic_name.clone(),
                        to: name.clone(),
                    });
                }
                record.topic_id = topic;
                record.topic_name = name.clone();
                record.chat_title = title.clone();
            }
        }
        drop(history);

        let mut retained = Vec::with_capacity(records.len());
        let mut removed = HashSet::new();
        let mut removed_per_topic: BTreeMap<TopicId, TopicTally> = BTreeMap::new();
        for (record, seen) in records.into_iter().zip(seen) {
            if seen {
                retained.push(record);
            } else {
                removed_per_topic
                    .entry(record.topic_id)
                    .or_insert_with(|| TopicTally::new(record.topic_name.clone()))
                    .count += 1;
                removed.insert(record.key());
            }
        }
        let removed_count: usize = removed_per_topic.values().map(|tally| tally.count).sum();

        let mut rebuilt = topics.without_alias();
        for record in &retained {
            if !rebuilt.contains(record.topic_id) {
                debug!(chat_id = %chat_id, topic = %record.topic_id, "backfilling topic hidden from listing");
                let name = self.topic_name(&TopicMap::new(), previous, record.topic_id);
                rebuilt.insert(record.topic_id, name);
            }
        }
        let mut activity = status.topic_last_ids.clone();
        activity.retain_topics(|topic| rebuilt.contains(topic));

        let favorites_dropped = self
            .store
            .commit_reconciliation(ReconciledChat {
                chat_id,
                title: title.clone(),
                retained,
                removed,
                topic_map: rebuilt,
                activity,
            })
            .await?;

        info!(
            chat_id = %chat_id,
            removed = removed_count,
            relabeled,
            favorites_dropped,
            "reconciliation committed"
        );
        Ok(ReconcileReport {
            chat_id,
            chat_title: title,
            removed: removed_count,
            relabeled,
            favorites_dropped,
            removed_per_topic,
            renames,
        })
    }

    /// Fresh name first, then the previously persisted one, then the
    /// placeholder.
    fn topic_name(&self, fresh: &TopicMap, previous: &TopicMap, topic: TopicId) -> String {
        fresh
            .get(topic)
            .or_else(|| previous.get(topic))
            .map(str::to_string)
            .unwrap_or_else(|| {
                threadcat_model::unknown_topic_label(&self.settings.unknown_topic_prefix, topic)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_removals_and_renames() {
        let mut report = ReconcileReport {
            chat_title: "Media".into(),
            removed: 1,
            relabeled: 2,
            ..ReconcileReport::default()
        };
        report
            .removed_per_topic
            .insert(TopicId(5), TopicTally { name: "Clips".into(), count: 1 });
        report.renames.insert(
            TopicId(5),
            TopicRename {
                from: "Clips".into(),
                to: "Highlights".into(),
            },
        );
        assert_eq!(
            report.to_string(),
            "Media: removed 1, relabeled 2\n  Clips: -1\n  Clips -> Highlights"
        );
    }

    #[test]
    fn clean_report_is_short() {
        let report = ReconcileReport {
            chat_title: "Media".into(),
            ..ReconcileReport::default()
        };
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "Media: in sync");
    }
}

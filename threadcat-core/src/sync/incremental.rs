use std::collections::BTreeMap;
use std::fmt;

use threadcat_model::{ChatId, MediaRecord, MessageId, TopicId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::settings::SyncSettings;
use super::topics::TopicResolver;
use super::{TopicTally, current_title, next_message};
use crate::error::Result;
use crate::remote::{ChatSource, HistoryQuery};
use crate::store::{IncrementalBatch, JsonStore};

/// What one incremental pass appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub chat_id: ChatId,
    pub chat_title: String,
    pub added: usize,
    pub per_topic: BTreeMap<TopicId, TopicTally>,
    /// Cursor persisted by this pass.
    pub cursor: MessageId,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.added == 0 {
            return write!(f, "{}: no new media", self.chat_title);
        }
        write!(f, "{}: {} new", self.chat_title, self.added)?;
        for tally in self.per_topic.values() {
            write!(f, "\n  {}: +{}", tally.name, tally.count)?;
        }
        Ok(())
    }
}

/// Appends media posted after the chat's cursor.
pub(crate) struct IncrementalScanner<'a> {
    source: &'a dyn ChatSource,
    store: &'a JsonStore,
    settings: &'a SyncSettings,
}

impl fmt::Debug for IncrementalScanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalScanner")
            .field("store", self.store)
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> IncrementalScanner<'a> {
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

    /// Walks history strictly after the cursor and commits the result in
    /// one store write. Nothing is persisted if the walk fails or is
    /// cancelled.
    pub(crate) async fn scan(
        &self,
        chat_id: ChatId,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let status = self.store.status(chat_id).await.unwrap_or_default();

        let mut cursor = status.last_id;
        if cursor == MessageId::default() {
            cursor = self
                .store
                .catalog()
                .await
                .iter()
                .filter(|record| record.chat_id == chat_id)
                .map(|record| record.message_id)
                .max()
                .unwrap_or_default();
            if cursor != MessageId::default() {
                debug!(chat_id = %chat_id, cursor = %cursor, "bootstrapped cursor from catalog");
            }
        }

        let title = current_title(self.source, chat_id, &status.title).await;
        let resolver = TopicResolver::new(self.source, self.settings);
        let mut topics = resolver
            .resolve(chat_id, &status.topic_map, false, cancel)
            .await?;
        let mut refreshed = false;

        let mut activity = status.topic_last_ids.clone();
        let mut max_seen = cursor;
        let mut records = Vec::new();
        let mut per_topic: BTreeMap<TopicId, TopicTally> = BTreeMap::new();

        let mut history = self.source.history(chat_id, HistoryQuery::after(cursor));
        while let Some(message) = next_message(&mut history, cancel, chat_id).await? {
            max_seen = max_seen.max(message.id);

            let Some((kind, extension)) = message
                .attachment
                .as_ref()
                .and_then(|attachment| self.settings.classify(attachment))
            else {
                continue;
            };

            let topic = message.topic_id();
            if !refreshed && !topics.contains(topic) {
                // One forced refresh per pass; later unknown topics keep a
                // placeholder until the next run.
                refreshed = true;
                debug!(chat_id = %chat_id, topic = %topic, "unknown topic; refreshing names");
                topics = resolver
                    .resolve(chat_id, &topics.without_alias(), true, cancel)
                    .await?;
            }
            let topic_name =
                topics.name_or_placeholder(topic, &self.settings.unknown_topic_prefix);

            activity.touch(topic, message.id);
            per_topic
                .entry(topic)
                .or_insert_with(|| TopicTally::new(topic_name.clone()))
                .count += 1;
            records.push(MediaRecord {
                chat_title: title.clone(),
                chat_id,
                topic_id: topic,
                topic_name,
                message_id: message.id,
                album_id: message.album_id,
                kind,
                extension,
                posted_at: message.posted_at,
            });
        }
        drop(history);

        let next_cursor = max_seen.max(status.last_id);
        let added = self
            .store
            .commit_incremental(IncrementalBatch {
                chat_id,
                title: title.clone(),
                records,
                cursor: next_cursor,
                topic_map: topics,
                activity,
            })
            .await?;

        info!(chat_id = %chat_id, added, cursor = %next_cursor, "incremental scan committed");
        Ok(ScanReport {
            chat_id,
            chat_title: title,
            added,
            per_topic,
            cursor: next_cursor,
        })
    }
}

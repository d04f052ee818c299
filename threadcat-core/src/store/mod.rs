//! Persistent state store: the catalog, favorites, tag taxonomy and sync
//! status documents.
//!
//! Every mutation is a read-modify-write of a whole document performed under
//! one store-wide write lock, scoped to the partition of the caller's chat.
//! That keeps concurrent synchronization of different chats from losing each
//! other's updates even though they share documents.

mod documents;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use threadcat_model::{
    ActivityTable, ChatId, MediaRecord, MessageId, RawTaxonomy, RecordKey,
    SyncStatus, SyncStatusTable, TagTaxonomy, TopicMap,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;

pub const DEFAULT_CATALOG_FILE: &str = "media_index.json";
pub const DEFAULT_FAVORITES_FILE: &str = "favorites.json";
pub const DEFAULT_TAXONOMY_FILE: &str = "tag.json";
pub const DEFAULT_STATUS_FILE: &str = "scan_status.json";

/// Locations of the four documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub catalog: PathBuf,
    pub favorites: PathBuf,
    pub taxonomy: PathBuf,
    pub status: PathBuf,
}

impl StorePaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            catalog: dir.join(DEFAULT_CATALOG_FILE),
            favorites: dir.join(DEFAULT_FAVORITES_FILE),
            taxonomy: dir.join(DEFAULT_TAXONOMY_FILE),
            status: dir.join(DEFAULT_STATUS_FILE),
        }
    }
}

/// Everything the query side needs, read at one store generation.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub generation: u64,
    pub catalog: Vec<MediaRecord>,
    pub favorites: Vec<MediaRecord>,
    pub taxonomy: TagTaxonomy,
}

/// Outcome of adding a chat to the watch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// The chat was already tracked under this title.
    AlreadyTracked(String),
}

/// Reconciled state of one chat, committed in a single store write.
#[derive(Debug, Clone)]
pub(crate) struct ReconciledChat {
    pub chat_id: ChatId,
    pub title: String,
    pub retained: Vec<MediaRecord>,
    pub removed: HashSet<RecordKey>,
    pub topic_map: TopicMap,
    pub activity: ActivityTable,
}

/// Incremental scan result, committed in a single store write.
#[derive(Debug, Clone)]
pub(crate) struct IncrementalBatch {
    pub chat_id: ChatId,
    pub title: String,
    pub records: Vec<MediaRecord>,
    pub cursor: MessageId,
    pub topic_map: TopicMap,
    pub activity: ActivityTable,
}

/// JSON-document backed state store.
pub struct JsonStore {
    paths: StorePaths,
    write_lock: Mutex<()>,
    generation: AtomicU64,
}

impl fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStore")
            .field("paths", &self.paths)
            .field("generation", &self.generation())
            .finish()
    }
}

impl JsonStore {
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(1),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(StorePaths::in_dir(dir))
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Monotonic counter bumped after every successful write.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub async fn catalog(&self) -> Vec<MediaRecord> {
        documents::load_sequence(&self.paths.catalog).await
    }

    pub async fn favorites(&self) -> Vec<MediaRecord> {
        documents::load_sequence(&self.paths.favorites).await
    }

    pub async fn taxonomy(&self) -> TagTaxonomy {
        let raw: RawTaxonomy =
            documents::load_or_default(&self.paths.taxonomy).await;
        let (taxonomy, rejected) = TagTaxonomy::from_raw(raw);
        for err in rejected {
            warn!(error = %err, "ignoring taxonomy entry");
        }
        taxonomy
    }

    pub async fn status_table(&self) -> SyncStatusTable {
        documents::load_or_default(&self.paths.status).await
    }

    pub async fn status(&self, chat_id: ChatId) -> Option<SyncStatus> {
        self.status_table().await.remove(&chat_id)
    }

    /// Reads catalog, favorites and taxonomy for index building.
    ///
    /// The generation is sampled before reading so a write racing the read
    /// makes the snapshot look stale rather than current.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let generation = self.generation();
        StoreSnapshot {
            generation,
            catalog: self.catalog().await,
            favorites: self.favorites().await,
            taxonomy: self.taxonomy().await,
        }
    }

    pub async fn register_chat(
        &self,
        chat_id: ChatId,
        title: &str,
    ) -> Result<Registration, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.status_table().await;
        if let Some(existing) = table.get(&chat_id) {
            return Ok(Registration::AlreadyTracked(existing.title.clone()));
        }
        table.insert(chat_id, SyncStatus::registered(title));
        documents::save(&self.paths.status, &table).await?;
        self.bump_generation();
        Ok(Registration::Registered)
    }

    /// Appends freshly scanned records and advances the chat's status.
    ///
    /// Records whose identity already exists are skipped and the stored
    /// cursor never moves backwards. Returns the number of records appended.
    pub(crate) async fn commit_incremental(
        &self,
        batch: IncrementalBatch,
    ) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.catalog().await;
        let known: HashSet<RecordKey> = catalog
            .iter()
            .filter(|record| record.chat_id == batch.chat_id)
            .map(MediaRecord::key)
            .collect();
        let before = catalog.len();
        catalog.extend(
            batch
                .records
                .into_iter()
                .filter(|record| !known.contains(&record.key())),
        );
        let appended = catalog.len() - before;
        if appended > 0 {
            documents::save(&self.paths.catalog, &catalog).await?;
        }

        let mut table = self.status_table().await;
        let entry = table.entry(batch.chat_id).or_default();
        entry.last_id = entry.last_id.max(batch.cursor);
        entry.topic_map = batch.topic_map.without_alias();
        entry.topic_last_ids = batch.activity;
        entry.title = batch.title;
        documents::save(&self.paths.status, &table).await?;

        self.bump_generation();
        debug!(chat_id = %batch.chat_id, appended, "incremental batch committed");
        Ok(appended)
    }

    /// Replaces the chat's catalog partition with the reconciled records,
    /// prunes removed records from favorites and rewrites the chat's topic
    /// map and activity. The cursor is left untouched.
    ///
    /// Returns the number of favorites dropped.
    pub(crate) async fn commit_reconciliation(
        &self,
        chat: ReconciledChat,
    ) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.catalog().await;
        catalog.retain(|record| record.chat_id != chat.chat_id);
        catalog.extend(chat.retained);
        documents::save(&self.paths.catalog, &catalog).await?;

        let mut favorites_dropped = 0;
        if !chat.removed.is_empty() {
            let mut favorites = self.favorites().await;
            let before = favorites.len();
            favorites.retain(|record| !chat.removed.contains(&record.key()));
            favorites_dropped = before - favorites.len();
            if favorites_dropped > 0 {
                documents::save(&self.paths.favorites, &favorites).await?;
            }
        }

        let mut table = self.status_table().await;
        let entry = table.entry(chat.chat_id).or_default();
        entry.topic_map = chat.topic_map.without_alias();
        entry.topic_last_ids = chat.activity;
        entry.title = chat.title;
        documents::save(&self.paths.status, &table).await?;

        self.bump_generation();
        Ok(favorites_dropped)
    }

    /// Copies records into favorites, skipping ones already present.
    pub async fn add_favorites(
        &self,
        records: &[MediaRecord],
    ) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut favorites = self.favorites().await;
        let mut present: HashSet<RecordKey> =
            favorites.iter().map(MediaRecord::key).collect();
        let before = favorites.len();
        for record in records {
            if present.insert(record.key()) {
                favorites.push(record.clone());
            }
        }
        let added = favorites.len() - before;
        if added > 0 {
            documents::save(&self.paths.favorites, &favorites).await?;
            self.bump_generation();
        }
        Ok(added)
    }

    /// Drops records from both catalog and favorites.
    ///
    /// Returns how many entries left the catalog and favorites respectively.
    pub async fn remove_records(
        &self,
        keys: &HashSet<RecordKey>,
    ) -> Result<(usize, usize), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.catalog().await;
        let catalog_before = catalog.len();
        catalog.retain(|record| !keys.contains(&record.key()));
        let catalog_removed = catalog_before - catalog.len();
        if catalog_removed > 0 {
            documents::save(&self.paths.catalog, &catalog).await?;
        }

        let mut favorites = self.favorites().await;
        let favorites_before = favorites.len();
        favorites.retain(|record| !keys.contains(&record.key()));
        let favorites_removed = favorites_before - favorites.len();
        if favorites_removed > 0 {
            documents::save(&self.paths.favorites, &favorites).await?;
        }

        if catalog_removed + favorites_removed > 0 {
            self.bump_generation();
        }
        Ok((catalog_removed, favorites_removed))
    }

    /// Record count per chat, used by reports.
    pub async fn record_counts(&self) -> HashMap<ChatId, usize> {
        let mut counts = HashMap::new();
        for record in self.catalog().await {
            *counts.entry(record.chat_id).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use threadcat_model::{MediaKind, TopicId};

    fn record(chat: i64, msg: i64) -> MediaRecord {
        MediaRecord {
            chat_title: "Chat".into(),
            chat_id: ChatId(chat),
            topic_id: TopicId(1),
            topic_name: "General".into(),
            message_id: MessageId(msg),
            album_id: None,
            kind: MediaKind::Photo,
            extension: String::new(),
            posted_at: Utc::now(),
        }
    }

    fn batch(chat: i64, records: Vec<MediaRecord>, cursor: i64) -> IncrementalBatch {
        IncrementalBatch {
            chat_id: ChatId(chat),
            title: "Chat".into(),
            records,
            cursor: MessageId(cursor),
            topic_map: TopicMap::new().with_alias("General"),
            activity: ActivityTable::new(),
        }
    }

    #[tokio::test]
    async fn incremental_commit_skips_known_records_and_never_regresses_cursor() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonStore::in_dir(tmp.path());

        let added = store
            .commit_incremental(batch(7, vec![record(7, 1), record(7, 2)], 2))
            .await
            .expect("first commit");
        assert_eq!(added, 2);

        let added = store
            .commit_incremental(batch(7, vec![record(7, 2)], 1))
            .await
            .expect("second commit");
        assert_eq!(added, 0);

        let status = store.status(ChatId(7)).await.expect("status");
        assert_eq!(status.last_id, MessageId(2));
        assert!(!status.topic_map.contains(TopicId::ALIAS));
        assert_eq!(store.catalog().await.len(), 2);
    }

    #[tokio::test]
    async fn reconciliation_only_touches_its_own_partition() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonStore::in_dir(tmp.path());
        store
            .commit_incremental(batch(7, vec![record(7, 1), record(7, 2)], 2))
            .await
            .expect("chat 7");
        store
            .commit_incremental(batch(8, vec![record(8, 1)], 1))
            .await
            .expect("chat 8");
        store
            .add_favorites(&[record(7, 2), record(8, 1)])
            .await
            .expect("favorites");

        let removed: HashSet<RecordKey> =
            [RecordKey::new(ChatId(7), MessageId(2))].into_iter().collect();
        let dropped = store
            .commit_reconciliation(ReconciledChat {
                chat_id: ChatId(7),
                title: "Renamed".into(),
                retained: vec![record(7, 1)],
                removed,
                topic_map: TopicMap::new(),
                activity: ActivityTable::new(),
            })
            .await
            .expect("reconcile");

        assert_eq!(dropped, 1);
        let catalog = store.catalog().await;
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().any(|r| r.chat_id == ChatId(8)));
        assert_eq!(store.favorites().await.len(), 1);
        let status = store.status(ChatId(7)).await.expect("status");
        assert_eq!(status.last_id, MessageId(2));
        assert_eq!(status.title, "Renamed");
    }

    #[tokio::test]
    async fn registering_twice_reports_existing_title() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonStore::in_dir(tmp.path());
        let first = store.register_chat(ChatId(-1001), "Clips").await.expect("register");
        assert_eq!(first, Registration::Registered);
        let second = store.register_chat(ChatId(-1001), "Other").await.expect("register");
        assert_eq!(second, Registration::AlreadyTracked("Clips".into()));
    }

    #[tokio::test]
    async fn writes_bump_the_generation() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonStore::in_dir(tmp.path());
        let before = store.generation();
        store.add_favorites(&[record(1, 1)]).await.expect("fav");
        assert!(store.generation() > before);
        let unchanged = store.generation();
        store.add_favorites(&[record(1, 1)]).await.expect("fav again");
        assert_eq!(store.generation(), unchanged);
    }

    #[tokio::test]
    async fn catalog_uses_the_legacy_field_names() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonStore::in_dir(tmp.path());
        store
            .commit_incremental(batch(7, vec![record(7, 1)], 1))
            .await
            .expect("commit");
        let raw = tokio::fs::read_to_string(&store.paths().catalog)
            .await
            .expect("read");
        for field in ["\"group\"", "\"group_id\"", "\"msg_id\"", "\"grouped_id\"", "\"type\""] {
            assert!(raw.contains(field), "missing {field}");
        }
        let status = tokio::fs::read_to_string(&store.paths().status)
            .await
            .expect("read");
        assert!(status.contains("\"last_id\""));
        assert!(status.contains("\"topic_last_ids\""));
    }
}

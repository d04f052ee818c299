use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use threadcat_model::{ChatId, MediaRecord, MessageId, RecordKey};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::incremental::{IncrementalScanner, ScanReport};
use super::reconcile::{ReconcileReport, Reconciler};
use super::settings::SyncSettings;
use crate::error::{Result, StoreError};
use crate::remote::ChatSource;
use crate::store::{JsonStore, Registration};

/// Result of one chat inside a batch run.
#[derive(Debug)]
pub struct ChatOutcome<R> {
    pub chat_id: ChatId,
    /// Stored title at the time the run started.
    pub title: String,
    pub result: Result<R>,
}

impl<R: fmt::Display> fmt::Display for ChatOutcome<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(report) => write!(f, "{report}"),
            Err(err) => write!(f, "{}: failed ({err})", self.title),
        }
    }
}

/// Per-chat outcomes of a batch run, in registration order.
#[derive(Debug)]
pub struct BatchReport<R> {
    pub run_id: Uuid,
    pub outcomes: Vec<ChatOutcome<R>>,
}

impl<R> BatchReport<R> {
    pub fn failures(&self) -> impl Iterator<Item = &ChatOutcome<R>> + '_ {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }
}

impl<R: fmt::Display> fmt::Display for BatchReport<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for outcome in &self.outcomes {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{outcome}")?;
        }
        Ok(())
    }
}

/// Local effect of a delete action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub catalog_removed: usize,
    pub favorites_removed: usize,
    /// Chats whose remote delete call failed; local removal happened anyway.
    pub remote_failures: usize,
}

/// Entry point for every operation that mutates the catalog.
///
/// Scans, reconciliations and favorite/delete actions for the same chat are
/// serialized through a per-chat lock; different chats may proceed in
/// parallel up to `max_parallel_chats` in batch runs.
pub struct SyncCoordinator {
    source: Arc<dyn ChatSource>,
    store: Arc<JsonStore>,
    settings: SyncSettings,
    max_parallel_chats: usize,
    chat_locks: DashMap<ChatId, Arc<Mutex<()>>>,
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("max_parallel_chats", &self.max_parallel_chats)
            .field("locked_chats", &self.chat_locks.len())
            .finish()
    }
}

impl SyncCoordinator {
    pub fn new(
        source: Arc<dyn ChatSource>,
        store: Arc<JsonStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
            max_parallel_chats: 1,
            chat_locks: DashMap::new(),
        }
    }

    pub fn with_max_parallel_chats(mut self, limit: usize) -> Self {
        self.max_parallel_chats = limit.max(1);
        self
    }

    pub fn store(&self) -> &Arc<JsonStore> {
        &self.store
    }

    pub fn source(&self) -> &Arc<dyn ChatSource> {
        &self.source
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = self
            .chat_locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Locks every chat in `chats` in ascending id order.
    async fn lock_chats(&self, chats: &BTreeSet<ChatId>) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(chats.len());
        for chat_id in chats {
            guards.push(self.lock_chat(*chat_id).await);
        }
        guards
    }

    pub async fn scan_incremental(
        &self,
        chat_id: ChatId,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let _guard = self.lock_chat(chat_id).await;
        IncrementalScanner::new(self.source.as_ref(), &self.store, &self.settings)
            .scan(chat_id, cancel)
            .await
    }

    pub async fn scan_full(
        &self,
        chat_id: ChatId,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport> {
        let _guard = self.lock_chat(chat_id).await;
        Reconciler::new(self.source.as_ref(), &self.store, &self.settings)
            .reconcile(chat_id, cancel)
            .await
    }

    pub async fn register_chat(
        &self,
        chat_id: ChatId,
        title: &str,
    ) -> std::result::Result<Registration, StoreError> {
        let _guard = self.lock_chat(chat_id).await;
        let registration = self.store.register_chat(chat_id, title).await?;
        if registration == Registration::Registered {
            info!(chat_id = %chat_id, title, "chat registered");
        }
        Ok(registration)
    }

    /// Incremental scan of every registered chat.
    pub async fn update_all(&self, cancel: &CancellationToken) -> BatchReport<ScanReport> {
        let chats: Vec<(ChatId, String)> = self
            .store
            .status_table()
            .await
            .into_iter()
            .map(|(chat_id, status)| (chat_id, status.title))
            .collect();
        let run_id = Uuid::now_v7();
        let span = info_span!("sync_batch", run_id = %run_id, mode = "incremental", chats = chats.len());
        let outcomes = self
            .run_batch(chats, |chat_id| self.scan_incremental(chat_id, cancel))
            .instrument(span)
            .await;
        BatchReport { run_id, outcomes }
    }

    /// Full reconciliation of the selected chats.
    pub async fn refresh(
        &self,
        chats: &[ChatId],
        cancel: &CancellationToken,
    ) -> BatchReport<ReconcileReport> {
        let table = self.store.status_table().await;
        let chats: Vec<(ChatId, String)> = chats
            .iter()
            .map(|chat_id| {
                let title = table
                    .get(chat_id)
                    .map(|status| status.title.clone())
                    .unwrap_or_else(|| chat_id.to_string());
                (*chat_id, title)
            })
            .collect();
        let run_id = Uuid::now_v7();
        let span = info_span!("sync_batch", run_id = %run_id, mode = "full", chats = chats.len());
        let outcomes = self
            .run_batch(chats, |chat_id| self.scan_full(chat_id, cancel))
            .instrument(span)
            .await;
        BatchReport { run_id, outcomes }
    }

    async fn run_batch<R, F, Fut>(
        &self,
        chats: Vec<(ChatId, String)>,
        run: F,
    ) -> Vec<ChatOutcome<R>>
    where
        F: Fn(ChatId) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let outcomes: Vec<ChatOutcome<R>> = futures::stream::iter(chats)
            .map(|(chat_id, title)| {
                let fut = run(chat_id);
                async move {
                    let result = fut.await;
                    if let Err(err) = &result {
                        warn!(chat_id = %chat_id, error = %err, "chat sync failed");
                    }
                    ChatOutcome {
                        chat_id,
                        title,
                        result,
                    }
                }
            })
            .buffered(self.max_parallel_chats)
            .collect()
            .await;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(total = outcomes.len(), failed, "batch finished");
        outcomes
    }

    /// Copies records into favorites; returns how many were new.
    pub async fn apply_favorite(
        &self,
        records: &[MediaRecord],
    ) -> std::result::Result<usize, StoreError> {
        let chats: BTreeSet<ChatId> = records.iter().map(|record| record.chat_id).collect();
        let _guards = self.lock_chats(&chats).await;
        self.store.add_favorites(records).await
    }

    /// Deletes the records remotely and locally.
    ///
    /// A failed remote delete is logged and counted; the local removal from
    /// catalog and favorites happens regardless.
    pub async fn apply_delete(
        &self,
        records: &[MediaRecord],
    ) -> std::result::Result<DeleteOutcome, StoreError> {
        let mut by_chat: BTreeMap<ChatId, Vec<MessageId>> = BTreeMap::new();
        for record in records {
            by_chat.entry(record.chat_id).or_default().push(record.message_id);
        }

        let mut outcome = DeleteOutcome::default();
        for (chat_id, mut ids) in by_chat {
            ids.sort();
            ids.dedup();
            let _guard = self.lock_chat(chat_id).await;
            if let Err(err) = self.source.delete_messages(chat_id, &ids).await {
                warn!(chat_id = %chat_id, error = %err, "remote delete failed; removing locally");
                outcome.remote_failures += 1;
            }
            let keys: HashSet<RecordKey> = ids
                .iter()
                .map(|message_id| RecordKey::new(chat_id, *message_id))
                .collect();
            let (catalog_removed, favorites_removed) = self.store.remove_records(&keys).await?;
            outcome.catalog_removed += catalog_removed;
            outcome.favorites_removed += favorites_removed;
        }
        Ok(outcome)
    }
}

//! Synchronization of the local catalog with remote chat history.
//!
//! [`incremental`] appends what was posted after a chat's cursor,
//! [`reconcile`] re-derives a chat's partition from its full history, and
//! [`coordinator`] serializes both per chat and drives batch runs. The
//! scanner and reconciler are only reachable through the coordinator.

pub mod coordinator;
pub mod incremental;
pub mod reconcile;
pub mod settings;
pub mod topics;

pub use coordinator::{BatchReport, ChatOutcome, DeleteOutcome, SyncCoordinator};
pub use incremental::ScanReport;
pub use reconcile::{ReconcileReport, TopicRename};
pub use settings::SyncSettings;
pub use topics::{Resolution, TopicResolver, TopicStrategy};

use futures::StreamExt;
use threadcat_model::ChatId;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Result, SyncError};
use crate::remote::{ChatSource, HistoryStream, RemoteMessage};

/// Per-topic record count in a report, with the label at the time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicTally {
    pub name: String,
    pub count: usize,
}

impl TopicTally {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }
}

/// Next history message, or `Cancelled` as soon as the token fires.
pub(crate) async fn next_message(
    history: &mut HistoryStream<'_>,
    cancel: &CancellationToken,
    chat_id: ChatId,
) -> Result<Option<RemoteMessage>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled(format!(
            "history walk for chat {chat_id}"
        ))),
        item = history.next() => Ok(item.transpose()?),
    }
}

/// Current chat title, keeping `fallback` when the lookup fails.
pub(crate) async fn current_title(
    source: &dyn ChatSource,
    chat_id: ChatId,
    fallback: &str,
) -> String {
    let stored = || {
        if fallback.is_empty() {
            chat_id.to_string()
        } else {
            fallback.to_string()
        }
    };
    match source.chat_title(chat_id).await {
        Ok(title) if !title.is_empty() => title,
        Ok(_) => stored(),
        Err(err) => {
            warn!(chat_id = %chat_id, error = %err, "chat title lookup failed; keeping stored title");
            stored()
        }
    }
}

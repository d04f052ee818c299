//! Read side of the catalog: tag counts, candidate groups and sampling.
//!
//! Queries run against a [`CatalogIndex`] rebuilt from the store whenever
//! its write generation moved, so a favorite or delete is visible to the
//! very next query.

pub mod index;
pub mod review;
pub mod sampling;

pub use index::{CatalogIndex, GroupKey, MediaGroup, Scope};
pub use review::{ChatActivity, ReviewSort, TopicActivity, activity_review};
pub use sampling::{sample, sample_with};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::store::JsonStore;

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Groups drawn when the caller does not ask for a number.
    pub sample_size: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct QueryEngine {
    store: Arc<JsonStore>,
    settings: QuerySettings,
    cached: Mutex<Option<Arc<CatalogIndex>>>,
}

impl QueryEngine {
    pub fn new(store: Arc<JsonStore>, settings: QuerySettings) -> Self {
        Self {
            store,
            settings,
            cached: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Index matching the store's current generation.
    pub async fn index(&self) -> Arc<CatalogIndex> {
        let mut cached = self.cached.lock().await;
        let generation = self.store.generation();
        if let Some(index) = cached.as_ref()
            && index.generation() == generation
        {
            return Arc::clone(index);
        }
        let index = Arc::new(CatalogIndex::from_snapshot(self.store.snapshot().await));
        debug!(generation = index.generation(), "catalog index rebuilt");
        *cached = Some(Arc::clone(&index));
        index
    }

    /// Drops the cached index and rebuilds it, picking up documents edited
    /// outside the store.
    pub async fn reload(&self) -> Arc<CatalogIndex> {
        self.cached.lock().await.take();
        self.index().await
    }

    pub async fn count(&self, scope: Scope, major: &str, minor: Option<&str>) -> usize {
        self.index().await.count(scope, major, minor)
    }

    pub async fn candidates(&self, scope: Scope, major: &str, minors: &[String]) -> Vec<MediaGroup> {
        self.index().await.candidates(scope, major, minors)
    }

    /// Samples `n` groups, or the configured default when `n` is `None`.
    pub fn sample(&self, groups: &[MediaGroup], n: Option<usize>) -> Vec<MediaGroup> {
        sample(groups, n.unwrap_or(self.settings.sample_size))
    }
}

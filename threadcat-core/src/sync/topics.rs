//! Topic id to name resolution with layered fallbacks.
//!
//! Resolution walks an ordered chain of strategies (cached names, the paged
//! remote listing, a full history scan for thread-creation events). Each one
//! either resolves the map or hands over to the next.

use async_trait::async_trait;
use threadcat_model::{ChatId, TopicMap};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::next_message;
use super::settings::SyncSettings;
use crate::error::{Result, SyncError};
use crate::remote::{ChatSource, HistoryQuery, ServiceAction};

/// Outcome of one resolution strategy.
#[derive(Debug)]
pub enum Resolution {
    Resolved(TopicMap),
    TryNext,
}

/// Inputs shared by every strategy in the chain.
pub struct ResolveContext<'a> {
    pub chat_id: ChatId,
    /// Names persisted in the chat's sync status.
    pub cached: &'a TopicMap,
    pub force_refresh: bool,
    pub source: &'a dyn ChatSource,
    pub settings: &'a SyncSettings,
    pub cancel: &'a CancellationToken,
}

impl std::fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("chat_id", &self.chat_id)
            .field("cached", self.cached)
            .field("force_refresh", &self.force_refresh)
            .finish_non_exhaustive()
    }
}

/// One step of the resolution chain.
#[async_trait]
pub trait TopicStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<Resolution>;
}

/// Serves the persisted map unless a refresh was requested.
#[derive(Debug, Default)]
pub struct CachedTopics;

#[async_trait]
impl TopicStrategy for CachedTopics {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<Resolution> {
        if ctx.force_refresh || ctx.cached.is_empty() {
            return Ok(Resolution::TryNext);
        }
        Ok(Resolution::Resolved(ctx.cached.clone()))
    }
}

/// Pages through the remote thread listing and overlays it on the cache.
#[derive(Debug, Default)]
pub struct RemoteListing;

#[async_trait]
impl TopicStrategy for RemoteListing {
    fn name(&self) -> &'static str {
        "listing"
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<Resolution> {
        match fetch_listing(ctx.source, ctx.chat_id, ctx.settings, ctx.cancel).await {
            Ok(listing) => {
                let mut merged = ctx.cached.clone();
                merged.merge(listing);
                if merged.is_empty() {
                    Ok(Resolution::TryNext)
                } else {
                    Ok(Resolution::Resolved(merged))
                }
            }
            Err(SyncError::Remote(err)) => {
                warn!(chat_id = %ctx.chat_id, error = %err, "topic listing failed; falling back");
                Ok(Resolution::TryNext)
            }
            Err(err) => Err(err),
        }
    }
}

/// Scans the full history for thread-creation service events.
#[derive(Debug, Default)]
pub struct HistoryScan;

#[async_trait]
impl TopicStrategy for HistoryScan {
    fn name(&self) -> &'static str {
        "history"
    }

    async fn attempt(&self, ctx: &ResolveContext<'_>) -> Result<Resolution> {
        let mut stream = ctx.source.history(ctx.chat_id, HistoryQuery::full());
        let mut merged = ctx.cached.clone();
        let mut found = 0usize;
        while let Some(message) = next_message(&mut stream, ctx.cancel, ctx.chat_id).await? {
            if let Some(ServiceAction::TopicCreated { topic_id, title }) = message.service {
                merged.insert(topic_id, title);
                found += 1;
            }
        }
        info!(chat_id = %ctx.chat_id, found, "recovered topic names from history");
        Ok(Resolution::Resolved(merged))
    }
}

/// Collects the complete remote listing for a chat.
pub async fn fetch_listing(
    source: &dyn ChatSource,
    chat_id: ChatId,
    settings: &SyncSettings,
    cancel: &CancellationToken,
) -> Result<TopicMap> {
    let page_size = settings.topic_page_size.max(1);
    let mut map = TopicMap::new();
    let mut offset = None;
    loop {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled(format!(
                "topic listing for chat {chat_id}"
            )));
        }
        let page = source.list_topics(chat_id, offset, page_size).await?;
        let Some(last) = page.last().map(|entry| entry.id) else {
            break;
        };
        let page_len = page.len();
        for entry in page {
            map.insert(entry.id, entry.title);
        }
        if page_len < page_size || offset == Some(last) {
            break;
        }
        offset = Some(last);
    }
    debug!(chat_id = %chat_id, topics = map.len(), "fetched topic listing");
    Ok(map)
}

/// Resolves topic names for one chat.
pub struct TopicResolver<'a> {
    source: &'a dyn ChatSource,
    settings: &'a SyncSettings,
    chain: Vec<Box<dyn TopicStrategy>>,
}

impl std::fmt::Debug for TopicResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain: Vec<&str> = self.chain.iter().map(|s| s.name()).collect();
        f.debug_struct("TopicResolver").field("chain", &chain).finish()
    }
}

impl<'a> TopicResolver<'a> {
    pub fn new(source: &'a dyn ChatSource, settings: &'a SyncSettings) -> Self {
        Self {
            source,
            settings,
            chain: vec![
                Box::new(CachedTopics),
                Box::new(RemoteListing),
                Box::new(HistoryScan),
            ],
        }
    }

    /// Resolved map for `chat_id`, always carrying the `0` alias.
    ///
    /// Without `force_refresh` a non-empty cache answers without remote
    /// calls.
    pub async fn resolve(
        &self,
        chat_id: ChatId,
        cached: &TopicMap,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<TopicMap> {
        let ctx = ResolveContext {
            chat_id,
            cached,
            force_refresh,
            source: self.source,
            settings: self.settings,
            cancel,
        };
        for strategy in &self.chain {
            if let Resolution::Resolved(map) = strategy.attempt(&ctx).await? {
                debug!(chat_id = %chat_id, strategy = strategy.name(), "topics resolved");
                return Ok(map.with_alias(&self.settings.default_topic_label));
            }
        }
        Ok(cached.clone().with_alias(&self.settings.default_topic_label))
    }

    /// Live listing only, falling back to the full chain when the listing
    /// call fails. Used by reconciliation, which must not inherit stale
    /// cached names for topics the listing still reports.
    pub async fn resolve_live(
        &self,
        chat_id: ChatId,
        cached: &TopicMap,
        cancel: &CancellationToken,
    ) -> Result<TopicMap> {
        match fetch_listing(self.source, chat_id, self.settings, cancel).await {
            Ok(listing) => Ok(listing.with_alias(&self.settings.default_topic_label)),
            Err(SyncError::Remote(err)) => {
                warn!(chat_id = %chat_id, error = %err, "live topic listing failed; using fallback chain");
                self.resolve(chat_id, cached, true, cancel).await
            }
            Err(err) => Err(err),
        }
    }
}

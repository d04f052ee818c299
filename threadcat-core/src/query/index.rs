use std::collections::{BTreeMap, BTreeSet, HashMap};

use threadcat_model::{AlbumId, ChatId, MediaRecord, RecordKey, TagTaxonomy, TopicKey};

use crate::store::StoreSnapshot;

/// Which document a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    All,
    Favorites,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Favorites => "favorites",
        }
    }
}

/// Identity of a sampling unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Records posted together as one album.
    Album(ChatId, AlbumId),
    Single(RecordKey),
}

impl GroupKey {
    pub fn of(record: &MediaRecord) -> Self {
        match record.album_id {
            Some(album) => GroupKey::Album(record.chat_id, album),
            None => GroupKey::Single(record.key()),
        }
    }
}

/// Records that are always sampled and displayed together, in ascending
/// message-id order.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaGroup {
    pub key: GroupKey,
    pub records: Vec<MediaRecord>,
}

impl MediaGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records of catalog and favorites bucketed by `(chat, topic)`.
///
/// Derived from a [`StoreSnapshot`] and never mutated afterwards; a store
/// write makes it stale and a new one must be built.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    generation: u64,
    taxonomy: TagTaxonomy,
    all: HashMap<TopicKey, Vec<MediaRecord>>,
    favorites: HashMap<TopicKey, Vec<MediaRecord>>,
}

fn bucket(records: Vec<MediaRecord>) -> HashMap<TopicKey, Vec<MediaRecord>> {
    let mut buckets: HashMap<TopicKey, Vec<MediaRecord>> = HashMap::new();
    for record in records {
        buckets.entry(record.topic_key()).or_default().push(record);
    }
    buckets
}

impl CatalogIndex {
    pub fn build(
        catalog: Vec<MediaRecord>,
        favorites: Vec<MediaRecord>,
        taxonomy: TagTaxonomy,
    ) -> Self {
        Self {
            generation: 0,
            taxonomy,
            all: bucket(catalog),
            favorites: bucket(favorites),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut index = Self::build(snapshot.catalog, snapshot.favorites, snapshot.taxonomy);
        index.generation = snapshot.generation;
        index
    }

    /// Store generation the index was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn taxonomy(&self) -> &TagTaxonomy {
        &self.taxonomy
    }

    fn buckets(&self, scope: Scope) -> &HashMap<TopicKey, Vec<MediaRecord>> {
        match scope {
            Scope::All => &self.all,
            Scope::Favorites => &self.favorites,
        }
    }

    /// Records under one minor category, or under every minor of `major`.
    ///
    /// Sums over every listed key, so a major's count equals the sum of its
    /// minors' counts even when minors share keys.
    pub fn count(&self, scope: Scope, major: &str, minor: Option<&str>) -> usize {
        let buckets = self.buckets(scope);
        self.taxonomy
            .listed_keys(major, minor)
            .iter()
            .filter_map(|key| buckets.get(key))
            .map(Vec::len)
            .sum()
    }

    /// Groups reachable from the selected minors of `major`.
    ///
    /// An empty `minors` slice selects every minor under the major. Records
    /// sharing an album id form one group; all others are singletons.
    pub fn candidates(&self, scope: Scope, major: &str, minors: &[String]) -> Vec<MediaGroup> {
        let keys: BTreeSet<TopicKey> = if minors.is_empty() {
            self.taxonomy.keys_for(major, None).into_iter().collect()
        } else {
            minors
                .iter()
                .flat_map(|minor| self.taxonomy.keys_for(major, Some(minor.as_str())))
                .collect()
        };

        let buckets = self.buckets(scope);
        let mut groups: BTreeMap<GroupKey, Vec<MediaRecord>> = BTreeMap::new();
        for record in keys.iter().filter_map(|key| buckets.get(key)).flatten() {
            groups.entry(GroupKey::of(record)).or_default().push(record.clone());
        }

        groups
            .into_iter()
            .map(|(key, mut records)| {
                records.sort_by_key(|record| record.message_id);
                MediaGroup { key, records }
            })
            .collect()
    }
}

//! Core data model definitions shared across threadcat crates.
#![allow(missing_docs)]

pub mod error;
pub mod ids;
pub mod record;
pub mod status;
pub mod taxonomy;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use ids::{AlbumId, ChatId, MessageId, TopicId};
pub use record::{MediaKind, MediaRecord, RecordKey};
pub use status::{
    ActivityTable, SyncStatus, SyncStatusTable, TopicMap, unknown_topic_label,
};
pub use taxonomy::{RawTaxonomy, TagTaxonomy, TopicKey, strip_annotation};

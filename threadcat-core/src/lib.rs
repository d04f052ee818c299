//! # Threadcat Core
//!
//! Catalog synchronization and query engine for media posted in
//! topic-threaded group chats.
//!
//! ## Overview
//!
//! - **Remote contract**: [`remote::ChatSource`] abstracts the chat-history
//!   collaborator (paged topic listing, history streams, deletes)
//! - **Store**: [`store::JsonStore`] persists the catalog, favorites, tag
//!   taxonomy and per-chat sync status as JSON documents
//! - **Sync**: topic resolution, incremental scanning past a cursor and full
//!   reconciliation, serialized per chat by [`sync::SyncCoordinator`]
//! - **Query**: tag counts, album-aware candidate groups and random sampling
//!   through [`query::QueryEngine`]
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use threadcat_core::{
//!     query::{QueryEngine, QuerySettings, Scope},
//!     remote::ChatSource,
//!     store::JsonStore,
//!     sync::{SyncCoordinator, SyncSettings},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn sync_and_sample(source: Arc<dyn ChatSource>) {
//!     let store = Arc::new(JsonStore::in_dir("data"));
//!     let coordinator =
//!         SyncCoordinator::new(source, Arc::clone(&store), SyncSettings::default());
//!     let report = coordinator.update_all(&CancellationToken::new()).await;
//!     println!("{report}");
//!
//!     let engine = QueryEngine::new(store, QuerySettings::default());
//!     let groups = engine
//!         .candidates(Scope::All, "Sports", &["Clips".to_string()])
//!         .await;
//!     for group in engine.sample(&groups, None) {
//!         println!("{} records", group.len());
//!     }
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod error;
pub mod links;
pub mod query;
pub mod remote;
pub mod store;
pub mod sync;

pub use error::{Result, StoreError, SyncError};
pub use links::{ResolvedChat, message_link, resolve_chat_link};
pub use remote::{ChatSource, RemoteError};
pub use store::{JsonStore, Registration, StorePaths};
pub use threadcat_model as model;

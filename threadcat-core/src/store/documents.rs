//! Reading and writing the individual JSON documents.
//!
//! Loads never fail: a missing or unreadable document degrades to its empty
//! default with a warning. Writes go through a sibling temp file and a rename
//! so readers never observe a half-written document.

use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Loads a whole document, falling back to `T::default()`.
pub(crate) async fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(bytes) = read_bytes(path).await else {
        return T::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "document is malformed; treating it as absent"
            );
            T::default()
        }
    }
}

/// Loads a JSON array entry by entry, dropping entries that fail to parse.
///
/// A single damaged record must not cost the rest of the catalog, which a
/// subsequent write would otherwise erase.
pub(crate) async fn load_sequence<T>(path: &Path) -> Vec<T>
where
    T: DeserializeOwned,
{
    let raw: Vec<serde_json::Value> = load_or_default(path).await;
    let total = raw.len();
    let parsed: Vec<T> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if parsed.len() != total {
        warn!(
            path = %path.display(),
            dropped = total - parsed.len(),
            "skipped malformed entries"
        );
    }
    parsed
}

async fn read_bytes(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "document not present yet");
            None
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "document unreadable; treating it as absent"
            );
            None
        }
    }
}

pub(crate) async fn save<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_document_loads_default() {
        let tmp = tempdir().expect("tempdir");
        let map: BTreeMap<String, u32> =
            load_or_default(&tmp.path().join("absent.json")).await;
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn malformed_document_loads_default() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("broken.json");
        tokio::fs::write(&path, b"{ not json").await.expect("write");
        let map: BTreeMap<String, u32> = load_or_default(&path).await;
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn sequence_keeps_parseable_entries() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("seq.json");
        tokio::fs::write(&path, br#"[1, "two", 3]"#)
            .await
            .expect("write");
        let values: Vec<u32> = load_sequence(&path).await;
        assert_eq!(values, vec![1, 3]);
    }

    #[tokio::test]
    async fn save_creates_parent_and_replaces_atomically() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("doc.json");
        save(&path, &vec![1u32, 2]).await.expect("first save");
        save(&path, &vec![3u32]).await.expect("second save");
        let values: Vec<u32> = load_or_default(&path).await;
        assert_eq!(values, vec![3]);
        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        assert!(!Path::new(&tmp_path).exists());
    }
}

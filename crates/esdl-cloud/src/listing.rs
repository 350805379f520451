//! Enumerating keys under a prefix

use crate::{CloudError, CloudStore, Result};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use object_store::path::Path;
use object_store::ObjectMeta;
use serde::Serialize;
use tracing::debug;

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    /// A pseudo-directory (common prefix)
    Prefix {
        /// Key relative to the bucket
        key: String,
    },
    /// A stored object
    Object {
        /// Key relative to the bucket
        key: String,
        /// Size in bytes
        size: u64,
        /// Last modification time reported by the store
        last_modified: DateTime<Utc>,
        /// Entity tag, when the store provides one
        e_tag: Option<String>,
    },
}

impl Entry {
    /// Key relative to the bucket
    pub fn key(&self) -> &str {
        match self {
            Entry::Prefix { key } | Entry::Object { key, .. } => key,
        }
    }

    /// True for pseudo-directories
    pub fn is_prefix(&self) -> bool {
        matches!(self, Entry::Prefix { .. })
    }

    /// Object size, `None` for prefixes
    pub fn size(&self) -> Option<u64> {
        match self {
            Entry::Prefix { .. } => None,
            Entry::Object { size, .. } => Some(*size),
        }
    }

    /// Last part of the key
    pub fn name(&self) -> &str {
        self.key().rsplit('/').next().unwrap_or_default()
    }
}

impl From<ObjectMeta> for Entry {
    fn from(meta: ObjectMeta) -> Self {
        Entry::Object {
            key: meta.location.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
            e_tag: meta.e_tag,
        }
    }
}

fn as_prefix(prefix: &Path) -> Option<&Path> {
    (!prefix.as_ref().is_empty()).then_some(prefix)
}

impl CloudStore {
    /// List one level beneath `prefix`: pseudo-directories first, then objects.
    ///
    /// When `prefix` names a single object rather than a directory, that
    /// object is returned on its own. A prefix that matches nothing at all
    /// propagates the store's not-found error.
    pub fn list(&self, prefix: &Path) -> Result<Vec<Entry>> {
        debug!("LIST {}/{} (delimited)", self.bucket(), prefix);
        let result = self
            .block_on(self.store().list_with_delimiter(as_prefix(prefix)))
            .map_err(CloudError::ObjectStore)?;

        let mut prefixes: Vec<String> = result
            .common_prefixes
            .into_iter()
            .map(|p| p.to_string())
            .collect();
        prefixes.sort();

        let mut objects = result.objects;
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        if prefixes.is_empty() && objects.is_empty() && as_prefix(prefix).is_some() {
            // Either a single object or nothing; let HEAD decide
            return Ok(vec![self.head(prefix)?.into()]);
        }

        Ok(prefixes
            .into_iter()
            .map(|key| Entry::Prefix { key })
            .chain(objects.into_iter().map(Entry::from))
            .collect())
    }

    /// Every object beneath `prefix`, sorted by key.
    ///
    /// Resolves a prefix the same way as [`list`](Self::list): a single
    /// object is returned on its own, and a prefix matching nothing
    /// propagates the store's not-found error.
    pub fn list_recursive(&self, prefix: &Path) -> Result<Vec<ObjectMeta>> {
        debug!("LIST {}/{} (recursive)", self.bucket(), prefix);
        let mut objects: Vec<ObjectMeta> = self
            .block_on(self.store().list(as_prefix(prefix)).try_collect())
            .map_err(CloudError::ObjectStore)?;

        if objects.is_empty() && as_prefix(prefix).is_some() {
            return Ok(vec![self.head(prefix)?]);
        }

        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    /// `bucket/key` strings for one level beneath `prefix`
    pub fn keys(&self, prefix: &Path) -> Result<Vec<String>> {
        Ok(self
            .list(prefix)?
            .iter()
            .map(|entry| format!("{}/{}", self.bucket(), entry.key()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use object_store::ObjectStore;
    use std::sync::Arc;

    fn store_with(keys: &[&str]) -> CloudStore {
        let memory = Arc::new(InMemory::new());
        let store = CloudStore::from_store("bucket", memory.clone()).unwrap();
        for key in keys {
            store
                .block_on(memory.put(&Path::from(*key), Bytes::from_static(b"abc").into()))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_list_one_level() {
        let store = store_with(&["a.zarr/.zgroup", "a.zarr/x/0", "b.zarr/.zgroup", "README"]);
        let entries = store.list(&Path::default()).unwrap();
        let keys: Vec<_> = entries.iter().map(Entry::key).collect();
        assert_eq!(keys, ["a.zarr", "b.zarr", "README"]);
        assert!(entries[0].is_prefix());
        assert_eq!(entries[2].size(), Some(3));
    }

    #[test]
    fn test_list_single_object() {
        let store = store_with(&["a.zarr/.zgroup"]);
        let entries = store.list(&Path::from("a.zarr/.zgroup")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), ".zgroup");
    }

    #[test]
    fn test_list_missing_prefix() {
        let store = store_with(&["a.zarr/.zgroup"]);
        let err = store.list(&Path::from("nope.zarr")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_keys_are_bucket_qualified() {
        let store = store_with(&["a.zarr/.zgroup", "a.zarr/x/0"]);
        let keys = store.keys(&Path::from("a.zarr")).unwrap();
        assert_eq!(keys, ["bucket/a.zarr/x", "bucket/a.zarr/.zgroup"]);
    }

    #[test]
    fn test_list_recursive_resolves_like_list() {
        let store = store_with(&["a.zarr/.zgroup"]);

        let objects = store.list_recursive(&Path::from("a.zarr/.zgroup")).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].location.as_ref(), "a.zarr/.zgroup");

        let err = store.list_recursive(&Path::from("nope.zarr")).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list(&Path::from("nope.zarr")).unwrap_err().is_not_found());

        assert_eq!(store.list_recursive(&Path::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_list_recursive_sorted() {
        let store = store_with(&["a.zarr/x/1", "a.zarr/x/0", "a.zarr/.zgroup", "b"]);
        let objects = store.list_recursive(&Path::from("a.zarr")).unwrap();
        let keys: Vec<_> = objects.iter().map(|m| m.location.to_string()).collect();
        assert_eq!(keys, ["a.zarr/.zgroup", "a.zarr/x/0", "a.zarr/x/1"]);
    }
}

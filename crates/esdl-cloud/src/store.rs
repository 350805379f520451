use crate::runtime::new_runtime;
use crate::{CloudError, Location, Result, DEFAULT_REGION};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{DynObjectStore, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// How to reach the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Skip request signing entirely (public buckets)
    pub anonymous: bool,
    /// Region of the bucket
    pub region: Option<String>,
    /// Endpoint of an S3-compatible service other than AWS
    pub endpoint: Option<String>,
    /// Permit plain http endpoints
    pub allow_http: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            anonymous: true,
            region: Some(DEFAULT_REGION.to_string()),
            endpoint: None,
            allow_http: false,
        }
    }
}

impl StoreOptions {
    /// Apply the region or endpoint a location carries in its URL
    pub fn merged_with(&self, location: &Location) -> Self {
        let mut merged = self.clone();
        if location.region.is_some() {
            merged.region = location.region.clone();
        }
        if location.endpoint.is_some() {
            merged.endpoint = location.endpoint.clone();
        }
        merged
    }
}

/// Handle to one bucket of an object store, usable from synchronous code
#[derive(Debug, Clone)]
pub struct CloudStore {
    bucket: String,
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
}

impl CloudStore {
    /// Create a handle to `bucket` on S3, without credentials when
    /// `options.anonymous` is set
    pub fn anonymous(bucket: &str, options: &StoreOptions) -> Result<Self> {
        let store = build_s3(bucket, options)?;
        Self::from_store(bucket, Arc::new(store))
    }

    /// Create a handle to the bucket a location names
    pub fn connect(location: &Location, options: &StoreOptions) -> Result<Self> {
        Self::anonymous(&location.bucket, &options.merged_with(location))
    }

    /// Wrap an existing object store (useful for testing)
    pub fn from_store(bucket: impl Into<String>, store: Arc<DynObjectStore>) -> Result<Self> {
        Ok(Self::from_store_and_runtime(bucket, store, new_runtime()?))
    }

    /// Create a CloudStore from existing store and runtime
    pub fn from_store_and_runtime(
        bucket: impl Into<String>,
        store: Arc<DynObjectStore>,
        runtime: Arc<Runtime>,
    ) -> Self {
        CloudStore {
            bucket: bucket.into(),
            store,
            runtime,
        }
    }

    /// Bucket this handle is bound to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the object store instance
    pub fn store(&self) -> &Arc<DynObjectStore> {
        &self.store
    }

    /// Get the Tokio runtime
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Drive a future on the handle's runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Fetch the metadata of one object
    pub fn head(&self, key: &Path) -> Result<ObjectMeta> {
        debug!("HEAD {}/{}", self.bucket, key);
        self.block_on(self.store.head(key))
            .map_err(CloudError::ObjectStore)
    }

    /// Fetch one object into memory
    pub fn get_bytes(&self, key: &Path) -> Result<Bytes> {
        debug!("GET {}/{}", self.bucket, key);
        let bytes = self.block_on(async { self.store.get(key).await?.bytes().await })?;
        Ok(bytes)
    }
}

fn build_s3(bucket: &str, options: &StoreOptions) -> Result<object_store::aws::AmazonS3> {
    let mut builder = if options.anonymous {
        AmazonS3Builder::new().with_skip_signature(true)
    } else {
        AmazonS3Builder::from_env()
    };
    builder = builder.with_bucket_name(bucket);

    if let Some(region) = &options.region {
        builder = builder.with_region(region);
    }

    let mut allow_http = options.allow_http;
    if let Some(endpoint) = &options.endpoint {
        allow_http |= endpoint.starts_with("http://");
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false);
    }

    debug!(
        "Creating S3 client for bucket {} (anonymous: {}, region: {:?}, endpoint: {:?})",
        bucket, options.anonymous, options.region, options.endpoint
    );

    builder
        .with_allow_http(allow_http)
        .build()
        .map_err(CloudError::ObjectStore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::ObjectStore;

    #[test]
    fn test_default_options_are_anonymous() {
        let options = StoreOptions::default();
        assert!(options.anonymous);
        assert_eq!(options.region.as_deref(), Some(DEFAULT_REGION));
        assert!(!options.allow_http);
    }

    #[test]
    fn test_options_merge_location() {
        let location = Location::parse("http://localhost:9000/cubes/a.zarr").unwrap();
        let merged = StoreOptions::default().merged_with(&location);
        assert_eq!(merged.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(merged.region.as_deref(), Some(DEFAULT_REGION));

        let location = Location::parse("https://s3.us-west-2.amazonaws.com/b/k").unwrap();
        let merged = StoreOptions::default().merged_with(&location);
        assert_eq!(merged.region.as_deref(), Some("us-west-2"));
        assert_eq!(merged.endpoint, None);
    }

    #[test]
    fn test_anonymous_handle_builds_offline() {
        let store = CloudStore::anonymous("esdl-esdc-v2.0.1", &StoreOptions::default()).unwrap();
        assert_eq!(store.bucket(), "esdl-esdc-v2.0.1");
    }

    #[test]
    fn test_head_and_get_bytes() {
        let memory = Arc::new(InMemory::new());
        let store = CloudStore::from_store("bucket", memory.clone()).unwrap();
        let key = Path::from("cube.zarr/.zgroup");

        store
            .block_on(memory.put(&key, Bytes::from_static(b"{\"zarr_format\": 2}").into()))
            .unwrap();

        assert_eq!(store.head(&key).unwrap().size as u64, 18);
        assert_eq!(store.get_bytes(&key).unwrap().as_ref(), b"{\"zarr_format\": 2}");

        let missing = store.head(&Path::from("cube.zarr/.zattrs")).unwrap_err();
        assert!(missing.is_not_found());
    }
}

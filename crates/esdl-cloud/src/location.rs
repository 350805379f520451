//! Remote collection identifiers
//!
//! A [`Location`] names a bucket and a key prefix inside it. The archive is
//! addressed in several spellings in the wild, all of which resolve to the
//! same bucket/prefix pair:
//!
//! - `esdl-esdc-v2.0.1/Cube.zarr` (bare, as used with s3fs)
//! - `s3://esdl-esdc-v2.0.1/Cube.zarr`
//! - `https://s3.eu-central-1.amazonaws.com/esdl-esdc-v2.0.1/Cube.zarr`
//! - `https://esdl-esdc-v2.0.1.s3.eu-central-1.amazonaws.com/Cube.zarr`
//! - `https://obs.example.com/esdl-esdc-v2.0.1/Cube.zarr` (custom endpoint)

use crate::{CloudError, Result};
use object_store::path::Path;
use std::fmt;
use url::Url;

const AWS_HOST_SUFFIX: &str = ".amazonaws.com";

/// A bucket plus key prefix, with any region or endpoint implied by the URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Bucket name
    pub bucket: String,
    /// Key prefix inside the bucket (may be empty)
    pub prefix: Path,
    /// Region taken from an AWS host name
    pub region: Option<String>,
    /// Endpoint of a non-AWS, S3-compatible service
    pub endpoint: Option<String>,
}

impl Location {
    /// Create a location for a bucket and prefix
    pub fn new(bucket: impl Into<String>, prefix: impl Into<Path>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            region: None,
            endpoint: None,
        }
    }

    /// Parse any of the supported spellings
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CloudError::InvalidLocation("empty location".to_string()));
        }

        if !input.contains("://") {
            let (bucket, key) = split_bucket(input.trim_start_matches('/'));
            return Self::with_key(input, bucket, key);
        }

        let url = Url::parse(input)
            .map_err(|e| CloudError::InvalidLocation(format!("{}: {}", input, e)))?;

        match url.scheme() {
            "s3" | "s3a" => {
                let bucket = url.host_str().unwrap_or_default();
                Self::with_url_key(input, bucket, url.path())
            }
            "http" | "https" => Self::from_http(input, &url),
            other => Err(CloudError::InvalidLocation(format!(
                "unsupported scheme '{}' in {}. Use s3://, https:// or bucket/key",
                other, input
            ))),
        }
    }

    fn from_http(input: &str, url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| CloudError::InvalidLocation(format!("missing host in {}", input)))?;

        if let Some(rest) = host.strip_suffix(AWS_HOST_SUFFIX) {
            if is_s3_service(rest) {
                // Path style: https://s3.<region>.amazonaws.com/<bucket>/<key>
                let (bucket, key) = split_bucket(url.path().trim_start_matches('/'));
                let mut location = Self::with_url_key(input, bucket, key)?;
                location.region = region_of(rest);
                return Ok(location);
            }
            if let Some(idx) = rest.rfind(".s3") {
                let service = &rest[idx + 1..];
                if is_s3_service(service) {
                    // Virtual hosted: https://<bucket>.s3.<region>.amazonaws.com/<key>
                    let mut location = Self::with_url_key(input, &rest[..idx], url.path())?;
                    location.region = region_of(service);
                    return Ok(location);
                }
            }
        }

        let (bucket, key) = split_bucket(url.path().trim_start_matches('/'));
        let mut location = Self::with_url_key(input, bucket, key)?;
        location.endpoint = Some(url.origin().ascii_serialization());
        Ok(location)
    }

    fn with_key(input: &str, bucket: &str, key: &str) -> Result<Self> {
        check_bucket(input, bucket)?;
        let prefix = Path::parse(key.trim_matches('/'))
            .map_err(|e| CloudError::InvalidLocation(format!("{}: {}", input, e)))?;
        Ok(Self::new(bucket, prefix))
    }

    /// Keys taken from a URL path are percent-encoded
    fn with_url_key(input: &str, bucket: &str, key: &str) -> Result<Self> {
        check_bucket(input, bucket)?;
        let prefix = Path::from_url_path(key.trim_matches('/'))
            .map_err(|e| CloudError::InvalidLocation(format!("{}: {}", input, e)))?;
        Ok(Self::new(bucket, prefix))
    }

    /// A location for a key relative to this one
    pub fn join(&self, key: &str) -> Self {
        let mut joined = self.clone();
        for part in key.split('/').filter(|p| !p.is_empty()) {
            joined.prefix = joined.prefix.child(part);
        }
        joined
    }

    /// Render a key in this bucket the way listings print it (`bucket/key`)
    pub fn display_key(&self, key: &Path) -> String {
        if key.as_ref().is_empty() {
            self.bucket.clone()
        } else {
            format!("{}/{}", self.bucket, key)
        }
    }

    /// `s3://bucket/prefix`
    pub fn to_url(&self) -> String {
        format!("s3://{}", self)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_key(&self.prefix))
    }
}

impl std::str::FromStr for Location {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

fn check_bucket(input: &str, bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(CloudError::InvalidLocation(format!(
            "missing bucket name in {}",
            input
        )));
    }
    Ok(())
}

fn split_bucket(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

fn is_s3_service(name: &str) -> bool {
    name == "s3" || name.starts_with("s3.") || name.starts_with("s3-")
}

fn region_of(service: &str) -> Option<String> {
    let region = service
        .strip_prefix("s3.")
        .or_else(|| service.strip_prefix("s3-"))?;
    let region = region.strip_prefix("dualstack.").unwrap_or(region);
    (!region.is_empty()).then(|| region.to_string())
}

//! # esdl-cloud
//!
//! Anonymous object-store access for the regional Earth System Data Lab. The
//! archive publishes its data cubes in a public S3 bucket; this crate wraps
//! `object_store` behind a synchronous handle so the three things a user
//! does with the archive read as plain calls:
//!
//! ```no_run
//! use esdl_cloud::{CloudStore, DownloadOptions, Location, StoreOptions};
//!
//! # fn main() -> esdl_cloud::Result<()> {
//! let bucket = Location::parse("esdl-esdc-v2.0.1")?;
//! let store = CloudStore::connect(&bucket, &StoreOptions::default())?;
//!
//! // List the available cubes
//! for key in store.keys(&bucket.prefix)? {
//!     println!("{}", key);
//! }
//!
//! // Download one of them
//! let cube = bucket.join("Cube_2019highColombiaCube_184x120x120.zarr");
//! let options = DownloadOptions { recursive: true, ..Default::default() };
//! store.download(&[cube.prefix], "./mylocalhighrescube".as_ref(), &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Location`]: bucket + key prefix parsed from bare, `s3://` or `https://` spellings
//! - [`CloudStore`]: the store handle; owns a current-thread Tokio runtime and blocks on
//!   each request, so every operation runs sequentially on the caller's thread
//! - [`CloudStore::list`] / [`CloudStore::list_recursive`]: enumeration
//! - [`CloudStore::download`]: recursive copy to a local directory

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod error;
mod listing;
mod location;
mod runtime;
mod store;
mod transfer;

pub use error::{CloudError, Result};
pub use listing::Entry;
pub use location::Location;
pub use store::{CloudStore, StoreOptions};
pub use transfer::{DownloadOptions, TransferEvent, TransferSummary};

// Re-export commonly used types from object_store
pub use object_store::{path::Path as ObjectPath, DynObjectStore, ObjectMeta, ObjectStore};

/// Bucket holding the regional data cubes
pub const DEFAULT_BUCKET: &str = "esdl-esdc-v2.0.1";

/// Region of [`DEFAULT_BUCKET`]
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Parse a location and connect to its bucket
///
/// Supports locations like:
/// - `esdl-esdc-v2.0.1/Cube.zarr`
/// - `s3://bucket/path/to/object`
/// - `https://s3.eu-central-1.amazonaws.com/bucket/path`
pub fn parse_cloud_url(url: &str, options: &StoreOptions) -> Result<(CloudStore, Location)> {
    let location = Location::parse(url)?;
    let store = CloudStore::connect(&location, options)?;
    Ok((store, location))
}

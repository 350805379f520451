//! Error types for esdl-core

use thiserror::Error;

/// Core error types for the esdl library
#[derive(Error, Debug)]
pub enum Error {
    /// Object-store access failed
    #[error("Cloud error: {0}")]
    Cloud(#[from] esdl_cloud::CloudError),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A Zarr metadata document could not be decoded
    #[error("Invalid metadata in {path}: {source}")]
    Metadata {
        /// Document key within the dataset
        path: String,
        /// Decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// The hierarchy does not form a coherent dataset
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Opening or reading an array failed
    #[error("Zarr error: {0}")]
    Zarr(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for esdl-core operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for esdl-cloud

use thiserror::Error;

/// Errors raised while reaching or copying from an object store
#[derive(Error, Debug)]
pub enum CloudError {
    /// The object store rejected or failed a request
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Writing to the local filesystem failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A location string could not be resolved to a bucket and key
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// An include glob did not compile
    #[error("Invalid include pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    /// The async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type for esdl-cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    /// True when the store reported that the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ObjectStore(object_store::Error::NotFound { .. }))
    }
}

impl From<CloudError> for std::io::Error {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Io(io_err) => io_err,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

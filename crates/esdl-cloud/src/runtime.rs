//! Tokio runtime management for synchronous operations

use crate::{CloudError, Result};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Build the runtime a store handle drives its requests on.
///
/// Everything runs on the calling thread; requests are issued one at a time.
pub(crate) fn new_runtime() -> Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CloudError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    Ok(Arc::new(runtime))
}

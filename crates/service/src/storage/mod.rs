//! Storage abstractions for service layer
//!
//! Contains the reusable file-backed record list and the trait the proxy
//! handlers use to fall back to it.

use std::path::Path;

use serde_json::{Map, Value};
use tokio::fs;

use crate::errors::ServiceError;

pub mod json_list_store;
pub mod record_store;

pub use json_list_store::{Criteria, JsonListStore, StoreSpec};
pub use record_store::RecordStore;

/// One untyped JSON record, stored as an element of the entity's array file.
pub type Record = Map<String, Value>;

/// Write `bytes` next to `path` and rename over it, so readers never see a half-written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
    fs::rename(&tmp, path).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
    Ok(())
}

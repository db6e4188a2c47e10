use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::storage::write_atomic;

pub const BROCHURE_CONFIG_FILE: &str = "brochure-config.json";

/// The brochure currently offered for download.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BrochureConfig {
    pub url: String,
    pub file_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Single-object JSON file tracking the current brochure URL.
pub struct BrochureConfigStore {
    file_path: PathBuf,
    write_lock: Mutex<()>,
}

impl BrochureConfigStore {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Arc<Self> {
        Arc::new(Self { file_path: data_dir.into().join(BROCHURE_CONFIG_FILE), write_lock: Mutex::new(()) })
    }

    /// `None` when nothing was uploaded yet or the file is unreadable.
    pub async fn current(&self) -> Option<BrochureConfig> {
        let bytes = fs::read(&self.file_path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "brochure config unreadable");
                None
            }
        }
    }

    pub async fn set(&self, url: String, file_name: String) -> Result<BrochureConfig, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let cfg = BrochureConfig { url, file_name, updated_at: Utc::now() };
        let data = serde_json::to_vec_pretty(&cfg).map_err(|e| ServiceError::Storage(e.to_string()))?;
        write_atomic(&self.file_path, &data).await?;
        info!(url = %cfg.url, "brochure config updated");
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cleanup, temp_dir};

    #[tokio::test]
    async fn set_then_read_back() -> Result<(), anyhow::Error> {
        let dir = temp_dir("brochure");
        let store = BrochureConfigStore::new(&dir);
        assert!(store.current().await.is_none());

        let saved = store.set("/uploads/brochures/a.pdf".into(), "a.pdf".into()).await?;
        assert_eq!(store.current().await, Some(saved));

        store.set("/uploads/brochures/b.pdf".into(), "b.pdf".into()).await?;
        assert_eq!(store.current().await.unwrap().file_name, "b.pdf");
        cleanup(&dir).await;
        Ok(())
    }
}

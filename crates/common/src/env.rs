//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the data and uploads directories exist; warn when the public URL is unset.
pub async fn ensure_env(data_dir: &Path, uploads_dir: &Path, public_url: Option<&str>) -> anyhow::Result<()> {
    for dir in [data_dir, uploads_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    if public_url.is_none() {
        warn!("app.public_url not set; upload responses will carry relative URLs");
    }
    info!(data_dir = %data_dir.display(), uploads_dir = %uploads_dir.display(), "runtime directories ready");
    Ok(())
}

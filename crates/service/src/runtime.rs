//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the server crate can prepare the
//! storage layout from the loaded config in one call.

/// Create the data and uploads directories named by the config.
pub async fn ensure_env(cfg: &configs::AppConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&cfg.storage.data_dir, &cfg.storage.uploads_dir, cfg.app.public_url.as_deref()).await
}

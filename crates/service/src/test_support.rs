#![cfg(test)]
use std::path::PathBuf;

/// Fresh, unique directory under the system temp dir for one test.
pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}", prefix, uuid::Uuid::new_v4()))
}

pub async fn cleanup(dir: &PathBuf) {
    let _ = tokio::fs::remove_dir_all(dir).await;
}

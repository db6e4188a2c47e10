use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub app: PublicAppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8081, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Token attached to privileged calls such as newsletter sends.
    #[serde(default)]
    pub service_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: default_backend_url(), timeout_secs: default_timeout(), service_token: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), uploads_dir: default_uploads_dir() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: default_cache_capacity(), ttl_secs: default_cache_ttl() }
    }
}

/// Upload destinations and per-kind byte ceilings.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// When set, images are forwarded to this host instead of written locally.
    #[serde(default)]
    pub image_host_url: Option<String>,
    #[serde(default = "default_thumbnail_limit")]
    pub thumbnail_max_bytes: u64,
    #[serde(default = "default_banner_limit")]
    pub banner_max_bytes: u64,
    #[serde(default = "default_profile_limit")]
    pub profile_max_bytes: u64,
    #[serde(default = "default_gallery_limit")]
    pub gallery_max_bytes: u64,
    #[serde(default = "default_brochure_limit")]
    pub brochure_max_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            image_host_url: None,
            thumbnail_max_bytes: default_thumbnail_limit(),
            banner_max_bytes: default_banner_limit(),
            profile_max_bytes: default_profile_limit(),
            gallery_max_bytes: default_gallery_limit(),
            brochure_max_bytes: default_brochure_limit(),
        }
    }
}

impl UploadsConfig {
    /// Largest configured ceiling, used to size the request body limit.
    pub fn max_ceiling(&self) -> u64 {
        [
            self.thumbnail_max_bytes,
            self.banner_max_bytes,
            self.profile_max_bytes,
            self.gallery_max_bytes,
            self.brochure_max_bytes,
        ]
        .into_iter()
        .max()
        .unwrap_or(default_brochure_limit())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PublicAppConfig {
    /// Absolute origin used when building public links, e.g. `https://example.com`.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_backend_url() -> String { "http://127.0.0.1:8000/api".into() }
fn default_timeout() -> u64 { 10 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_uploads_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_cache_capacity() -> usize { 100 }
fn default_cache_ttl() -> u64 { 300 }
fn default_thumbnail_limit() -> u64 { 5 * MB }
fn default_banner_limit() -> u64 { 10 * MB }
fn default_profile_limit() -> u64 { 5 * MB }
fn default_gallery_limit() -> u64 { 10 * MB }
fn default_brochure_limit() -> u64 { 20 * MB }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

/// Defaults only when the file does not exist; unreadable or malformed files are errors.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(anyhow!("failed to read config {path}: {e}")),
    };
    toml::from_str(&content).map_err(|e| anyhow!("invalid config {path}: {e}"))
}

impl AppConfig {
    /// File (if present) + environment overrides, normalized and validated.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_or_default(&config_path())?;
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a variable lookup (the process env in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_HOST") { self.server.host = v; }
        if let Some(p) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) { self.server.port = p; }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|w| w.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(v) = lookup("BACKEND_API_URL") { self.backend.base_url = v; }
        if let Some(t) = lookup("BACKEND_TIMEOUT_SECS").and_then(|t| t.parse::<u64>().ok()) {
            self.backend.timeout_secs = t;
        }
        if let Some(v) = lookup("NEWSLETTER_SERVICE_TOKEN") { self.backend.service_token = Some(v); }
        if let Some(v) = lookup("DATA_DIR") { self.storage.data_dir = PathBuf::from(v); }
        if let Some(v) = lookup("UPLOADS_DIR") { self.storage.uploads_dir = PathBuf::from(v); }
        if let Some(v) = lookup("IMAGE_HOST_URL") { self.uploads.image_host_url = Some(v); }
        if let Some(v) = lookup("APP_PUBLIC_URL") { self.app.public_url = Some(v); }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.backend.normalize_and_validate()?;
        if self.cache.capacity == 0 {
            return Err(anyhow!("cache.capacity must be >= 1"));
        }
        self.uploads.image_host_url = non_blank(self.uploads.image_host_url.take());
        self.app.public_url = non_blank(self.app.public_url.take()).map(|u| u.trim_end_matches('/').to_string());
        Ok(())
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        Ok(())
    }
}

impl BackendConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("backend.base_url must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout();
        }
        self.service_token = non_blank(self.service_token.take());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_upload_ceilings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.uploads.thumbnail_max_bytes, 5 * MB);
        assert_eq!(cfg.uploads.brochure_max_bytes, 20 * MB);
        assert_eq!(cfg.uploads.max_ceiling(), 20 * MB);
        assert_eq!(cfg.backend.timeout_secs, 10);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [backend]
            base_url = "https://api.example.com/v1/"
            [cache]
            capacity = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.capacity, 5);
        assert_eq!(cfg.cache.ttl_secs, 300);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn env_overrides_then_normalizes() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BACKEND_API_URL", "https://api.example.com/"),
            ("APP_PUBLIC_URL", "https://site.example.com/"),
            ("NEWSLETTER_SERVICE_TOKEN", "  "),
            ("SERVER_PORT", "9090"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.backend.base_url, "https://api.example.com");
        assert_eq!(cfg.app.public_url.as_deref(), Some("https://site.example.com"));
        assert_eq!(cfg.backend.service_token, None);
        assert_eq!(cfg.server.port, 9090);
    }

    #[test]
    fn rejects_non_http_backend() {
        let mut cfg = AppConfig::default();
        cfg.backend.base_url = "ftp://files".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("configs-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("configs-absent-{}.toml", std::process::id()));
        let cfg = load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.backend.base_url, "http://127.0.0.1:8000/api");
    }

    #[test]
    fn malformed_file_is_an_error_not_defaults() {
        let path = temp_config("malformed", "[backend]\nbase_url = \"https://prod.example.com\"\ntimeout_secs = \"ten\"\n");
        let err = load_or_default(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("invalid config"), "{err}");
        std::fs::remove_file(&path).unwrap();

        let path = temp_config("valid", "[backend]\nbase_url = \"https://prod.example.com\"\n");
        let cfg = load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.backend.base_url, "https://prod.example.com");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_zero_cache_capacity() {
        let mut cfg = AppConfig::default();
        cfg.cache.capacity = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }
}

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use configs::AppConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub struct TestApp {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Records currently persisted in `<data_dir>/<file>`.
    pub async fn stored(&self, file: &str) -> Vec<Value> {
        match tokio::fs::read(self.data_dir.join(file)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn cleanup(self) {
        let root = self.data_dir.parent().map(PathBuf::from).unwrap_or(self.data_dir);
        let _ = tokio::fs::remove_dir_all(root).await;
    }
}

async fn serve(app: Router) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(addr)
}

/// A backend URL nothing listens on: bind an ephemeral port, then release it.
pub async fn unreachable_backend() -> String {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}/api", addr)
}

/// Serve `routes` under `/api` as a stand-in backend.
pub async fn fake_backend(routes: Router) -> String {
    let addr = serve(Router::new().nest("/api", routes)).await.expect("fake backend");
    format!("http://{}/api", addr)
}

pub fn test_config(backend_url: &str) -> AppConfig {
    let root = std::env::temp_dir().join(format!("site-gateway-it-{}", Uuid::new_v4()));
    let mut cfg = AppConfig::default();
    cfg.backend.base_url = backend_url.to_string();
    cfg.backend.timeout_secs = 3;
    cfg.storage.data_dir = root.join("data");
    cfg.storage.uploads_dir = root.join("uploads");
    cfg
}

pub async fn start_gateway(cfg: AppConfig) -> TestApp {
    let data_dir = cfg.storage.data_dir.clone();
    let uploads_dir = cfg.storage.uploads_dir.clone();
    let app = server::build_app(cfg).await.expect("build app");
    let addr = serve(app).await.expect("serve gateway");
    TestApp { base_url: format!("http://{}", addr), data_dir, uploads_dir }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().build().expect("reqwest client")
}

/// Unsigned token carrying the given role claim; the gateway only decodes it.
pub fn token_with_role(role: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
    let claims = URL_SAFE_NO_PAD.encode(json!({"sub": "1", "role": role}).to_string());
    format!("Bearer {header}.{claims}.signature")
}

pub fn admin_token() -> String {
    token_with_role(json!("ADMIN"))
}

pub fn student_token() -> String {
    token_with_role(json!(2))
}

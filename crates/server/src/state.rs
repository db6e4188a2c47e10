use std::sync::Arc;
use std::time::Duration;

use common::{backend::BackendClient, cache::ResponseCache};
use configs::AppConfig;
use service::file::{
    blogs::BlogStore, brochure::BrochureConfigStore, enrollments::EnrollmentStore, users::UserStore,
};
use service::uploads::LocalUploads;

/// Everything handlers share, built once at startup and injected through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: BackendClient,
    pub cache: ResponseCache,
    pub blogs: Arc<BlogStore>,
    pub users: Arc<UserStore>,
    pub course_enrollments: Arc<EnrollmentStore>,
    pub batch_enrollments: Arc<EnrollmentStore>,
    pub brochure: Arc<BrochureConfigStore>,
    pub uploads: LocalUploads,
}

impl AppState {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.storage.data_dir.clone();
        let backend = BackendClient::new(&config.backend.base_url, config.backend.timeout_secs)?;
        let cache = ResponseCache::new(config.cache.capacity, Duration::from_secs(config.cache.ttl_secs));
        let uploads = LocalUploads::new(config.storage.uploads_dir.clone(), config.app.public_url.clone());

        Ok(Self {
            backend,
            cache,
            blogs: BlogStore::new(&data_dir).await?,
            users: UserStore::new(&data_dir).await?,
            course_enrollments: EnrollmentStore::course(&data_dir).await?,
            batch_enrollments: EnrollmentStore::batch(&data_dir).await?,
            brochure: BrochureConfigStore::new(&data_dir),
            uploads,
            config: Arc::new(config),
        })
    }
}

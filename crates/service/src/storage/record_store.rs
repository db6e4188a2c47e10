use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::ids::RecordId;
use crate::storage::{Criteria, JsonListStore, Record};

/// Trait abstraction for local fallback storage of one entity.
/// Proxy handlers fall back through this seam so they stay agnostic of the file layout.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get_all(&self) -> Vec<Record>;
    async fn get_by_id(&self, id: &RecordId) -> Option<Record>;
    async fn add(&self, record: Record) -> Result<Record, ServiceError>;
    async fn update(&self, id: &RecordId, patch: Record) -> Result<Option<Record>, ServiceError>;
    async fn delete(&self, id: &RecordId) -> Result<bool, ServiceError>;
    async fn filter(&self, criteria: &Criteria) -> Vec<Record>;
}

#[async_trait]
impl RecordStore for JsonListStore {
    fn name(&self) -> &'static str { JsonListStore::name(self) }
    async fn get_all(&self) -> Vec<Record> { JsonListStore::get_all(self).await }
    async fn get_by_id(&self, id: &RecordId) -> Option<Record> { JsonListStore::get_by_id(self, id).await }
    async fn add(&self, record: Record) -> Result<Record, ServiceError> { JsonListStore::add(self, record).await }
    async fn update(&self, id: &RecordId, patch: Record) -> Result<Option<Record>, ServiceError> { JsonListStore::update(self, id, patch).await }
    async fn delete(&self, id: &RecordId) -> Result<bool, ServiceError> { JsonListStore::delete(self, id).await }
    async fn filter(&self, criteria: &Criteria) -> Vec<Record> { JsonListStore::filter(self, criteria).await }
}

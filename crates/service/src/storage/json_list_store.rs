use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracing::{error, info, warn};

use crate::errors::ServiceError;
use crate::ids::{IdStrategy, RecordId};
use crate::storage::{write_atomic, Record};

/// Static description of one entity file.
#[derive(Debug, Clone, Copy)]
pub struct StoreSpec {
    /// Resource name used in logs and metrics, e.g. `blogs`.
    pub name: &'static str,
    pub file_name: &'static str,
    pub ids: IdStrategy,
    /// Whether `updated_at` is stamped alongside `created_at`.
    pub track_updates: bool,
}

/// Exact-match field criteria for [`JsonListStore::filter`].
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    fields: Vec<(String, Value)>,
}

impl Criteria {
    pub fn new() -> Self { Self::default() }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// A string criterion matches a number field by its textual form, and vice versa.
    pub fn matches(&self, record: &Record) -> bool {
        self.fields.iter().all(|(field, wanted)| match (record.get(field), wanted) {
            (None, _) => false,
            (Some(have), wanted) if have == wanted => true,
            (Some(Value::Number(n)), Value::String(s)) | (Some(Value::String(s)), Value::Number(n)) => {
                n.to_string() == *s
            }
            (Some(Value::Bool(b)), Value::String(s)) | (Some(Value::String(s)), Value::Bool(b)) => b.to_string() == *s,
            _ => false,
        })
    }
}

/// Generic JSON file-backed record list.
///
/// The whole array is read, changed in memory and written back on every
/// mutation. A per-store mutex serializes those cycles so two requests in
/// this process cannot lose each other's writes.
pub struct JsonListStore {
    spec: StoreSpec,
    file_path: PathBuf,
    write_lock: Mutex<()>,
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl JsonListStore {
    /// Open the store at `<data_dir>/<spec.file_name>`. Creates the file with an empty array if missing.
    pub async fn new<P: Into<PathBuf>>(data_dir: P, spec: StoreSpec) -> Result<Arc<Self>, ServiceError> {
        let file_path = data_dir.into().join(spec.file_name);
        if fs::metadata(&file_path).await.is_err() {
            write_atomic(&file_path, b"[]").await?;
            info!(resource = spec.name, path = %file_path.display(), "created empty store file");
        }
        Ok(Arc::new(Self { spec, file_path, write_lock: Mutex::new(()) }))
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Absent or unparsable file reads as an empty collection.
    async fn read(&self) -> Vec<Record> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(resource = self.spec.name, error = %e, "store read failed; treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<Value>>(&bytes) {
            Ok(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(m) => Some(m),
                    _ => None,
                })
                .collect(),
            Err(e) => {
                warn!(resource = self.spec.name, error = %e, "store file is not a JSON array; treating as empty");
                Vec::new()
            }
        }
    }

    async fn persist(&self, records: &[Record]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(records).map_err(|e| ServiceError::Storage(e.to_string()))?;
        write_atomic(&self.file_path, &data).await.map_err(|e| {
            error!(resource = self.spec.name, path = %self.file_path.display(), error = %e, "store write failed");
            e
        })
    }

    pub async fn get_all(&self) -> Vec<Record> {
        self.read().await
    }

    pub async fn get_by_id(&self, id: &RecordId) -> Option<Record> {
        self.read().await.into_iter().find(|r| id.matches_record(r))
    }

    /// Append a record, generating its id when missing, and return what was stored.
    pub async fn add(&self, mut record: Record) -> Result<Record, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await;

        match record.get("id").and_then(RecordId::from_value) {
            Some(id) if records.iter().any(|r| id.matches_record(r)) => {
                return Err(ServiceError::Conflict(format!("{} id {} already exists", self.spec.name, id)));
            }
            Some(_) => {}
            None => {
                record.insert("id".into(), self.spec.ids.generate(&records)?);
            }
        }

        let now = now_rfc3339();
        record.entry("created_at").or_insert_with(|| Value::String(now.clone()));
        if self.spec.track_updates {
            record.insert("updated_at".into(), Value::String(now));
        }

        records.push(record.clone());
        self.persist(&records).await?;
        info!(resource = self.spec.name, id = %record["id"], event = "local_add", "record stored locally");
        Ok(record)
    }

    /// Shallow-merge `patch` over the record; `None` when the id is unknown (file untouched).
    pub async fn update(&self, id: &RecordId, patch: Record) -> Result<Option<Record>, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await;
        let Some(idx) = records.iter().position(|r| id.matches_record(r)) else {
            return Ok(None);
        };

        let existing = &mut records[idx];
        for (k, v) in patch {
            if k == "id" {
                continue;
            }
            existing.insert(k, v);
        }
        if self.spec.track_updates {
            existing.insert("updated_at".into(), Value::String(now_rfc3339()));
        }
        let updated = existing.clone();

        self.persist(&records).await?;
        info!(resource = self.spec.name, %id, event = "local_update", "record updated locally");
        Ok(Some(updated))
    }

    /// Remove the record; returns whether anything was removed. A no-op does not rewrite the file.
    pub async fn delete(&self, id: &RecordId) -> Result<bool, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await;
        let before = records.len();
        records.retain(|r| !id.matches_record(r));
        if records.len() == before {
            return Ok(false);
        }
        self.persist(&records).await?;
        info!(resource = self.spec.name, %id, event = "local_delete", "record deleted locally");
        Ok(true)
    }

    pub async fn filter(&self, criteria: &Criteria) -> Vec<Record> {
        self.read().await.into_iter().filter(|r| criteria.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cleanup, temp_dir};
    use serde_json::json;

    const WIDGETS: StoreSpec = StoreSpec {
        name: "widgets",
        file_name: "widgets.json",
        ids: IdStrategy::Timestamp,
        track_updates: true,
    };

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn add_then_get_returns_input_plus_generated_fields() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;

        let stored = store.add(rec(json!({"title": "Hello", "status": "DRAFT"}))).await?;
        let id = RecordId::from_value(&stored["id"]).unwrap();
        let found = store.get_by_id(&id).await.unwrap();
        assert_eq!(found, stored);
        assert_eq!(found["title"], "Hello");
        assert!(found["id"].is_i64());
        assert!(found.contains_key("created_at"));
        assert!(found.contains_key("updated_at"));

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn ids_stay_unique_across_fast_adds() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        for i in 0..5 {
            store.add(rec(json!({"n": i}))).await?;
        }
        let mut ids: Vec<i64> = store.get_all().await.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);

        let dup = store.add(rec(json!({"id": ids[0]}))).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn add_after_max_id_is_a_conflict_not_a_panic() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        store.add(rec(json!({"id": i64::MAX, "title": "last"}))).await?;
        let before = tokio::fs::read(store.file_path()).await?;

        let res = store.add(rec(json!({"title": "next"}))).await;
        assert!(matches!(res, Err(ServiceError::Conflict(_))));
        assert_eq!(tokio::fs::read(store.file_path()).await?, before);
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_id_leaves_file_untouched() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        store.add(rec(json!({"title": "a"}))).await?;
        let before = tokio::fs::read(store.file_path()).await?;

        let res = store.update(&RecordId::Num(1), rec(json!({"title": "b"}))).await?;
        assert!(res.is_none());
        assert_eq!(tokio::fs::read(store.file_path()).await?, before);
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_merges_shallowly_and_keeps_id() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        let stored = store.add(rec(json!({"title": "a", "meta": {"x": 1}}))).await?;
        let id = RecordId::from_value(&stored["id"]).unwrap();

        let updated = store
            .update(&id, rec(json!({"id": 1, "meta": {"y": 2}, "status": "PUBLISHED"})))
            .await?
            .unwrap();
        assert_eq!(updated["id"], stored["id"]);
        assert_eq!(updated["title"], "a");
        assert_eq!(updated["meta"], json!({"y": 2}));
        assert_eq!(updated["created_at"], stored["created_at"]);
        assert_eq!(store.get_by_id(&id).await.unwrap(), updated);
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_twice_is_idempotent() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        let stored = store.add(rec(json!({"title": "gone"}))).await?;
        store.add(rec(json!({"title": "kept"}))).await?;
        let id = RecordId::from_value(&stored["id"]).unwrap();

        assert!(store.delete(&id).await?);
        let after_first = tokio::fs::read(store.file_path()).await?;
        assert!(!store.delete(&id).await?);
        assert_eq!(tokio::fs::read(store.file_path()).await?, after_first);
        assert_eq!(store.get_all().await.len(), 1);
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_file_reads_as_empty() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        tokio::fs::write(store.file_path(), b"{not json").await?;
        assert!(store.get_all().await.is_empty());
        tokio::fs::remove_file(store.file_path()).await?;
        assert!(store.get_all().await.is_empty());
        assert!(store.get_by_id(&RecordId::Num(1)).await.is_none());
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn filter_matches_exact_fields() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        store.add(rec(json!({"status": "PUBLISHED", "category_id": 2}))).await?;
        store.add(rec(json!({"status": "DRAFT", "category_id": 2}))).await?;
        store.add(rec(json!({"status": "PUBLISHED", "category_id": 3}))).await?;

        let published = store.filter(&Criteria::new().eq("status", "PUBLISHED")).await;
        assert_eq!(published.len(), 2);
        let cat2 = store.filter(&Criteria::new().eq("status", "PUBLISHED").eq("category_id", "2")).await;
        assert_eq!(cat2.len(), 1);
        assert_eq!(store.filter(&Criteria::new()).await.len(), 3);
        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_do_not_lose_writes() -> Result<(), anyhow::Error> {
        let dir = temp_dir("json_list_store");
        let store = JsonListStore::new(&dir, WIDGETS).await?;
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = Arc::clone(&store);
            handles.push(tokio::spawn(async move { s.add(rec(json!({"n": i}))).await }));
        }
        for h in handles {
            h.await??;
        }
        assert_eq!(store.get_all().await.len(), 16);
        cleanup(&dir).await;
        Ok(())
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use common::jwt::Role;
use serde_json::Value;

use crate::errors::ServiceError;
use crate::ids::IdStrategy;
use crate::storage::{JsonListStore, Record, StoreSpec};

pub const USERS: StoreSpec = StoreSpec {
    name: "users",
    file_name: "users.json",
    ids: IdStrategy::Timestamp,
    track_updates: true,
};

/// Local user profiles (`users.json`).
#[derive(Clone)]
pub struct UserStore {
    store: Arc<JsonListStore>,
}

impl UserStore {
    pub async fn new<P: Into<PathBuf>>(data_dir: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonListStore::new(data_dir, USERS).await?;
        Ok(Arc::new(Self { store }))
    }

    pub fn records(&self) -> &Arc<JsonListStore> {
        &self.store
    }

    pub async fn instructors(&self) -> Vec<Record> {
        self.store
            .get_all()
            .await
            .into_iter()
            .filter(|r| {
                r.get("is_instructor").and_then(Value::as_bool).unwrap_or(false)
                    || r.get("role").and_then(Role::from_value) == Some(Role::Instructor)
            })
            .collect()
    }

    pub async fn create(&self, mut input: Record) -> Result<Record, ServiceError> {
        normalize_user(&mut input)?;
        self.store.add(input).await
    }
}

/// Require some name, canonicalize `role` to its name and derive `is_instructor` when absent.
pub fn normalize_user(record: &mut Record) -> Result<(), ServiceError> {
    let has_name = ["name", "first_name", "full_name"]
        .iter()
        .any(|k| record.get(*k).and_then(Value::as_str).map_or(false, |s| !s.trim().is_empty()));
    if !has_name {
        return Err(ServiceError::Validation("name is required".into()));
    }
    normalize_role(record)?;
    if !record.contains_key("is_instructor") {
        let instructor = record.get("role").and_then(Role::from_value) == Some(Role::Instructor);
        record.insert("is_instructor".into(), Value::Bool(instructor));
    }
    Ok(())
}

/// Replace a numeric or lowercase `role` with its canonical name; unknown roles are rejected.
pub fn normalize_role(record: &mut Record) -> Result<(), ServiceError> {
    match record.get("role") {
        None | Some(Value::Null) => {}
        Some(v) => {
            let role = Role::from_value(v).ok_or_else(|| ServiceError::Validation(format!("invalid role {v}")))?;
            record.insert("role".into(), Value::from(role.as_str()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RecordId;
    use crate::storage::Criteria;
    use crate::test_support::{cleanup, temp_dir};
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn numeric_roles_become_names() {
        let mut r = rec(json!({"name": "Ada", "role": 3}));
        normalize_user(&mut r).unwrap();
        assert_eq!(r["role"], "INSTRUCTOR");
        assert_eq!(r["is_instructor"], true);

        let mut bad = rec(json!({"name": "Ada", "role": 7}));
        assert!(normalize_user(&mut bad).is_err());
        assert!(normalize_user(&mut rec(json!({"role": 1}))).is_err());
    }

    #[tokio::test]
    async fn instructors_and_role_filters() -> Result<(), anyhow::Error> {
        let dir = temp_dir("user_store");
        let users = UserStore::new(&dir).await?;
        users.create(rec(json!({"name": "A", "role": "admin"}))).await?;
        let b = users.create(rec(json!({"first_name": "B", "role": 3}))).await?;
        users.create(rec(json!({"name": "C", "role": 2, "is_instructor": true}))).await?;

        assert_eq!(users.instructors().await.len(), 2);
        let admins = users.records().filter(&Criteria::new().eq("role", "ADMIN")).await;
        assert_eq!(admins.len(), 1);

        let id = RecordId::from_value(&b["id"]).unwrap();
        let updated = users.records().update(&id, rec(json!({"profile_image_url": "/u.png"}))).await?.unwrap();
        assert_eq!(updated["profile_image_url"], "/u.png");
        assert_eq!(updated["role"], "INSTRUCTOR");
        cleanup(&dir).await;
        Ok(())
    }
}

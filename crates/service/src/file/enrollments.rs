use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ServiceError;
use crate::ids::IdStrategy;
use crate::storage::{JsonListStore, Record, StoreSpec};

pub const COURSE_ENROLLMENTS: StoreSpec = StoreSpec {
    name: "course-enrollments",
    file_name: "course-enrollments.json",
    ids: IdStrategy::LocalToken,
    track_updates: false,
};

pub const BATCH_ENROLLMENTS: StoreSpec = StoreSpec {
    name: "batch-enrollments",
    file_name: "batch-enrollments.json",
    ids: IdStrategy::LocalToken,
    track_updates: false,
};

/// Registration form as submitted by the site. Accepts both the old and new field spellings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub course_id: Option<Value>,
    #[serde(default)]
    pub batch_id: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An enrollment that passed validation; field names follow the backend schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_name: Option<String>,
    pub course_id: Option<Value>,
    pub batch_id: Option<Value>,
    pub message: Option<String>,
}

fn required(v: Option<String>, field: &str) -> Result<String, ServiceError> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::Validation(format!("{field} is required")))
}

fn optional(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn present(v: Option<Value>) -> Option<Value> {
    v.filter(|v| !v.is_null() && v.as_str().map_or(true, |s| !s.trim().is_empty()))
}

impl EnrollmentInput {
    pub fn validate(self) -> Result<Enrollment, ServiceError> {
        let name = required(self.name, "name")?;
        let email = required(self.email, "email")?;
        if !email.contains('@') {
            return Err(ServiceError::Validation("email is invalid".into()));
        }
        let phone = required(self.phone, "phone")?;
        Ok(Enrollment {
            name,
            email,
            phone,
            course_name: optional(self.course_name),
            course_id: present(self.course_id),
            batch_id: present(self.batch_id),
            message: optional(self.message),
        })
    }
}

impl Enrollment {
    fn fields(&self, phone_key: &str) -> Record {
        let mut rec = Record::new();
        rec.insert("name".into(), Value::from(self.name.clone()));
        rec.insert("email".into(), Value::from(self.email.clone()));
        rec.insert(phone_key.into(), Value::from(self.phone.clone()));
        if let Some(v) = &self.course_name { rec.insert("course_name".into(), Value::from(v.clone())); }
        if let Some(v) = &self.course_id { rec.insert("course_id".into(), v.clone()); }
        if let Some(v) = &self.batch_id { rec.insert("batch_id".into(), v.clone()); }
        if let Some(v) = &self.message { rec.insert("message".into(), Value::from(v.clone())); }
        rec
    }

    /// Payload in the shape the backend expects.
    pub fn upstream_payload(&self) -> Value {
        Value::Object(self.fields("phone_number"))
    }

    fn to_record(&self) -> Record {
        let mut rec = self.fields("phone");
        rec.insert("source".into(), Value::from("local"));
        rec
    }
}

/// Append-only log of submissions accepted while the backend was unavailable.
#[derive(Clone)]
pub struct EnrollmentStore {
    store: Arc<JsonListStore>,
}

impl EnrollmentStore {
    pub async fn course<P: Into<PathBuf>>(data_dir: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonListStore::new(data_dir, COURSE_ENROLLMENTS).await?;
        Ok(Arc::new(Self { store }))
    }

    pub async fn batch<P: Into<PathBuf>>(data_dir: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonListStore::new(data_dir, BATCH_ENROLLMENTS).await?;
        Ok(Arc::new(Self { store }))
    }

    pub fn records(&self) -> &Arc<JsonListStore> {
        &self.store
    }

    pub async fn add_submission(&self, enrollment: &Enrollment) -> Result<Record, ServiceError> {
        self.store.add(enrollment.to_record()).await
    }

    pub async fn list(&self) -> Vec<Record> {
        self.store.get_all().await
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::ServiceError;
use crate::ids::IdStrategy;
use crate::pagination::{ListQuery, PageInfo};
use crate::storage::{Criteria, JsonListStore, Record, StoreSpec};

pub const BLOGS: StoreSpec = StoreSpec {
    name: "blogs",
    file_name: "blogs.json",
    ids: IdStrategy::Timestamp,
    track_updates: true,
};

pub const STATUSES: [&str; 3] = ["DRAFT", "PUBLISHED", "ACTIVE"];

/// Statuses visible on the public site.
pub const PUBLIC_STATUSES: [&str; 2] = ["PUBLISHED", "ACTIVE"];

/// Local blog posts (`blogs.json`), used when the backend is unavailable.
#[derive(Clone)]
pub struct BlogStore {
    store: Arc<JsonListStore>,
}

impl BlogStore {
    pub async fn new<P: Into<PathBuf>>(data_dir: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonListStore::new(data_dir, BLOGS).await?;
        Ok(Arc::new(Self { store }))
    }

    pub fn records(&self) -> &Arc<JsonListStore> {
        &self.store
    }

    pub async fn find_by_slug(&self, slug: &str) -> Option<Record> {
        self.store.filter(&Criteria::new().eq("slug", slug)).await.into_iter().next()
    }

    /// Filter, newest first, then paginate.
    pub async fn list(&self, query: &ListQuery) -> (Vec<Value>, PageInfo) {
        self.list_where(query, |_| true).await
    }

    /// Like [`list`](Self::list), restricted to PUBLISHED and ACTIVE posts.
    pub async fn list_published(&self, query: &ListQuery) -> (Vec<Value>, PageInfo) {
        self.list_where(query, |r| {
            r.get("status").and_then(Value::as_str).map_or(false, |s| PUBLIC_STATUSES.contains(&s))
        })
        .await
    }

    async fn list_where(&self, query: &ListQuery, keep: impl Fn(&Record) -> bool) -> (Vec<Value>, PageInfo) {
        let mut criteria = Criteria::new();
        if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
            criteria = criteria.eq("status", status.trim().to_ascii_uppercase());
        }
        if let Some(cat) = query.category_id.as_deref().filter(|s| !s.trim().is_empty()) {
            criteria = criteria.eq("category_id", cat.trim());
        }
        let needle = query.search.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        let mut items: Vec<Record> = self
            .store
            .filter(&criteria)
            .await
            .into_iter()
            .filter(|r| keep(r))
            .filter(|r| match &needle {
                None => true,
                Some(n) => r.get("title").and_then(Value::as_str).map_or(false, |t| t.to_lowercase().contains(n)),
            })
            .collect();
        items.sort_by(|a, b| created_at(b).cmp(created_at(a)));
        query.paginate(items.into_iter().map(Value::Object).collect())
    }

    /// Validate and default-fill, then store.
    pub async fn create(&self, mut input: Record) -> Result<Record, ServiceError> {
        apply_blog_defaults(&mut input)?;
        if let Some(slug) = input.get("slug").and_then(Value::as_str) {
            if self.find_by_slug(slug).await.is_some() {
                return Err(ServiceError::Conflict(format!("slug '{slug}' already in use")));
            }
        }
        self.store.add(input).await
    }
}

fn created_at(r: &Record) -> &str {
    r.get("created_at").and_then(Value::as_str).unwrap_or("")
}

/// Require a title and fill `status`, `visibility` and `slug` when absent.
pub fn apply_blog_defaults(record: &mut Record) -> Result<(), ServiceError> {
    let title = record
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Validation("title is required".into()))?
        .to_string();

    normalize_status(record)?;
    record.entry("status").or_insert_with(|| Value::from("DRAFT"));
    record.entry("visibility").or_insert_with(|| Value::from("PUBLIC"));

    let has_slug = record.get("slug").and_then(Value::as_str).map_or(false, |s| !s.trim().is_empty());
    if !has_slug {
        record.insert("slug".into(), Value::from(slugify(&title)));
    }
    Ok(())
}

/// Uppercase a present `status` and reject unknown values.
pub fn normalize_status(record: &mut Record) -> Result<(), ServiceError> {
    if let Some(raw) = record.get("status").and_then(Value::as_str) {
        let status = raw.trim().to_ascii_uppercase();
        if !STATUSES.contains(&status.as_str()) {
            return Err(ServiceError::Validation(format!("invalid status '{raw}'")));
        }
        record.insert("status".into(), Value::from(status));
    }
    Ok(())
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut dash = false;
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cleanup, temp_dir};
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("Rust & Axum -- 2024"), "rust-axum-2024");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let mut r = rec(json!({"title": "My Post", "status": "published"}));
        apply_blog_defaults(&mut r).unwrap();
        assert_eq!(r["status"], "PUBLISHED");
        assert_eq!(r["visibility"], "PUBLIC");
        assert_eq!(r["slug"], "my-post");
    }

    #[test]
    fn defaults_reject_missing_title_and_bad_status() {
        assert!(matches!(apply_blog_defaults(&mut rec(json!({"title": " "}))), Err(ServiceError::Validation(_))));
        let mut bad = rec(json!({"title": "x", "status": "ARCHIVED"}));
        assert!(matches!(apply_blog_defaults(&mut bad), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn create_list_and_lookup_by_slug() -> Result<(), anyhow::Error> {
        let dir = temp_dir("blog_store");
        let blogs = BlogStore::new(&dir).await?;
        blogs.create(rec(json!({"title": "First", "status": "PUBLISHED", "category_id": 1}))).await?;
        blogs.create(rec(json!({"title": "Second draft"}))).await?;
        blogs.create(rec(json!({"title": "Third", "status": "ACTIVE", "category_id": 2}))).await?;

        assert_eq!(blogs.find_by_slug("second-draft").await.unwrap()["status"], "DRAFT");

        let q = ListQuery { status: Some("published".into()), ..Default::default() };
        let (items, info) = blogs.list(&q).await;
        assert_eq!(items.len(), 1);
        assert_eq!(info.total, 1);

        let q = ListQuery { search: Some("THIRD".into()), ..Default::default() };
        assert_eq!(blogs.list(&q).await.0[0]["title"], "Third");

        let (public, info) = blogs.list_published(&ListQuery::default()).await;
        assert_eq!(info.total, 2);
        assert!(public.iter().all(|b| b["status"] != "DRAFT"));
        let q = ListQuery { status: Some("draft".into()), ..Default::default() };
        assert!(blogs.list_published(&q).await.0.is_empty());

        let dup = blogs.create(rec(json!({"title": "First"}))).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));
        cleanup(&dir).await;
        Ok(())
    }
}

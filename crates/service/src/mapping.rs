//! Canonical shapes for backend payloads.
//!
//! The backend has renamed fields several times; each table lists, per
//! canonical field, the spellings accepted in priority order. Original fields
//! are kept so nothing the frontend already reads disappears.

use common::jwt::Role;
use serde::Serialize;
use serde_json::{Map, Value};

pub struct FieldAlias {
    pub canonical: &'static str,
    pub sources: &'static [&'static str],
}

const fn alias(canonical: &'static str, sources: &'static [&'static str]) -> FieldAlias {
    FieldAlias { canonical, sources }
}

pub const COURSE_FIELDS: &[FieldAlias] = &[
    alias("id", &["id", "course_id", "_id"]),
    alias("title", &["title", "name", "course_name"]),
    alias("slug", &["slug", "course_slug"]),
    alias("description", &["description", "short_description", "summary"]),
    alias("thumbnail_url", &["thumbnail_url", "thumbnailUrl", "thumbnail", "image_url", "image"]),
    alias("price", &["price", "fee", "course_fee"]),
    alias("duration", &["duration", "course_duration", "duration_weeks"]),
    alias("instructor_name", &["instructor_name", "instructorName", "instructor"]),
];

pub const GALLERY_FIELDS: &[FieldAlias] = &[
    alias("id", &["id", "image_id", "_id"]),
    alias("image_url", &["image_url", "imageUrl", "url", "src", "file_url"]),
    alias("title", &["title", "caption", "alt"]),
    alias("category", &["category", "category_name", "album"]),
];

pub const USER_FIELDS: &[FieldAlias] = &[
    alias("id", &["id", "user_id", "_id"]),
    alias("first_name", &["first_name", "firstName"]),
    alias("last_name", &["last_name", "lastName"]),
    alias("profile_image_url", &["profile_image_url", "profileImageUrl", "avatar", "profile_image"]),
    alias("role", &["role", "role_name", "role_id"]),
    alias("is_instructor", &["is_instructor", "isInstructor"]),
];

pub const BLOG_FIELDS: &[FieldAlias] = &[
    alias("id", &["id", "blog_id", "_id"]),
    alias("thumbnail_url", &["thumbnail_url", "thumbnailUrl", "thumbnail"]),
    alias("banner_url", &["banner_url", "bannerUrl", "banner"]),
    alias("category_id", &["category_id", "categoryId"]),
    alias("author_id", &["author_id", "authorId"]),
    alias("created_at", &["created_at", "createdAt"]),
    alias("updated_at", &["updated_at", "updatedAt"]),
];

/// Keys under which the backend has returned lists.
const LIST_KEYS: &[&str] = &["data", "items", "results", "rows", "courses", "blogs", "users", "gallery", "images"];
const PAGINATION_KEYS: &[&str] = &["pagination", "meta", "page_info"];

/// Copy the record and set each canonical field from the first non-null source.
pub fn canonicalize(record: &Value, table: &[FieldAlias]) -> Value {
    let Some(obj) = record.as_object() else {
        return record.clone();
    };
    let mut out: Map<String, Value> = obj.clone();
    for field in table {
        if let Some(v) = field.sources.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null()) {
            out.insert(field.canonical.to_string(), v.clone());
        }
    }
    Value::Object(out)
}

/// User records additionally carry the role as a name rather than an id.
pub fn canonicalize_user(record: &Value) -> Value {
    let mut out = canonicalize(record, USER_FIELDS);
    if let Some(obj) = out.as_object_mut() {
        if let Some(role) = obj.get("role").and_then(Role::from_value) {
            obj.insert("role".into(), Value::from(role.as_str()));
            obj.entry("is_instructor").or_insert(Value::Bool(role == Role::Instructor));
        }
    }
    out
}

/// List payload in canonical form.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CanonicalList {
    pub items: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

/// Find the list in a backend body (bare array, or wrapped under one of several keys, possibly twice).
pub fn extract_list(body: &Value) -> CanonicalList {
    fn find(body: &Value, depth: u8) -> Option<(Vec<Value>, Option<Value>)> {
        if let Some(arr) = body.as_array() {
            return Some((arr.clone(), None));
        }
        let obj = body.as_object()?;
        let pagination = PAGINATION_KEYS.iter().find_map(|k| obj.get(*k)).cloned();
        for key in LIST_KEYS {
            match obj.get(*key) {
                Some(Value::Array(arr)) => return Some((arr.clone(), pagination)),
                Some(inner @ Value::Object(_)) if depth > 0 => {
                    if let Some((items, inner_pagination)) = find(inner, depth - 1) {
                        return Some((items, inner_pagination.or(pagination)));
                    }
                }
                _ => {}
            }
        }
        None
    }
    let (items, pagination) = find(body, 1).unwrap_or_default();
    CanonicalList { items, pagination }
}

/// Extract and canonicalize every item of a list body.
pub fn canonical_list(body: &Value, map: impl Fn(&Value) -> Value) -> CanonicalList {
    let mut list = extract_list(body);
    list.items = list.items.iter().map(map).collect();
    list
}

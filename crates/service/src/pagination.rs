//! Pagination and list filters shared by proxied and local list endpoints.
//!
//! `ListQuery` is deserialized straight from the inbound query string, turned
//! into the backend's query pairs, or applied to a local collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 1-based page index
    #[serde(default)]
    pub page: Option<u32>,
    /// items per page
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

impl ListQuery {
    /// Clamp to sane defaults: page >= 1, limit within 1..=100.
    pub fn normalize(&self) -> (u32, u32) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }

    /// Query string pairs for the backend, omitting empty filters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let (page, limit) = self.normalize();
        let mut pairs = vec![("page".to_string(), page.to_string()), ("limit".to_string(), limit.to_string())];
        for (k, v) in [("status", &self.status), ("category_id", &self.category_id), ("search", &self.search)] {
            if let Some(v) = v.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((k.to_string(), v.to_string()));
            }
        }
        pairs
    }

    /// Stable cache key suffix for this query.
    pub fn cache_key(&self, path: &str) -> String {
        let qs = self
            .to_query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{qs}")
    }

    /// Slice an already-filtered local collection.
    pub fn paginate(&self, items: Vec<Value>) -> (Vec<Value>, PageInfo) {
        let (page, limit) = self.normalize();
        let total = items.len();
        let total_pages = total.div_ceil(limit as usize);
        let start = (page as usize - 1).saturating_mul(limit as usize);
        let slice = items.into_iter().skip(start).take(limit as usize).collect();
        (slice, PageInfo { page, limit, total, total_pages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let q = ListQuery { page: Some(0), limit: Some(0), ..Default::default() };
        assert_eq!(q.normalize(), (1, 1));
        assert_eq!(ListQuery::default().normalize(), (1, DEFAULT_LIMIT));
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let q = ListQuery { page: Some(5), limit: Some(1000), ..Default::default() };
        assert_eq!(q.normalize(), (5, 100));
    }

    #[test]
    fn query_pairs_skip_blank_filters() {
        let q = ListQuery { status: Some("PUBLISHED".into()), search: Some("  ".into()), ..Default::default() };
        assert_eq!(
            q.to_query_pairs(),
            vec![
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("status".to_string(), "PUBLISHED".to_string()),
            ]
        );
        assert_eq!(q.cache_key("/blogs"), "/blogs?page=1&limit=10&status=PUBLISHED");
    }

    #[test]
    fn paginate_reports_totals() {
        let items: Vec<Value> = (0..7).map(|i| json!(i)).collect();
        let q = ListQuery { page: Some(2), limit: Some(3), ..Default::default() };
        let (page, info) = q.paginate(items);
        assert_eq!(page, vec![json!(3), json!(4), json!(5)]);
        assert_eq!(info, PageInfo { page: 2, limit: 3, total: 7, total_pages: 3 });
    }
}

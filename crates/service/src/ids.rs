//! Record id generation and matching.
//!
//! Blogs and users carry numeric ids derived from the creation time in
//! milliseconds; enrollment submissions carry `local-<ms>-<token>` strings so
//! records created while the backend was down stay recognizable.

use std::fmt;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::storage::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    Timestamp,
    LocalToken,
}

impl IdStrategy {
    /// Fresh id that does not collide with any record in `existing`.
    pub fn generate(&self, existing: &[Record]) -> Result<Value, ServiceError> {
        match self {
            IdStrategy::Timestamp => timestamp_id(existing).map(Value::from),
            IdStrategy::LocalToken => loop {
                let candidate = local_token();
                let id = RecordId::Text(candidate.clone());
                if !existing.iter().any(|r| id.matches_record(r)) {
                    break Ok(Value::String(candidate));
                }
            },
        }
    }
}

/// Current time in ms, bumped past the largest numeric id when two adds land in the same millisecond.
/// Fails once the largest stored id is already `i64::MAX`.
pub fn timestamp_id(existing: &[Record]) -> Result<i64, ServiceError> {
    let now = Utc::now().timestamp_millis();
    let max = existing
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(i64::MIN);
    if now > max {
        return Ok(now);
    }
    max.checked_add(1)
        .ok_or_else(|| ServiceError::Conflict(format!("no numeric id left after {max}")))
}

pub fn local_token() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("local-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Id as it arrives from a URL path or request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    Num(i64),
    Text(String),
}

impl RecordId {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => RecordId::Num(n),
            Err(_) => RecordId::Text(raw.to_string()),
        }
    }

    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().map(RecordId::Num),
            Value::String(s) if !s.trim().is_empty() => Some(RecordId::parse(s)),
            _ => None,
        }
    }

    /// Numeric ids and their decimal strings are treated as the same id.
    pub fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (RecordId::Num(n), Value::Number(m)) => m.as_i64() == Some(*n),
            (RecordId::Num(n), Value::String(s)) => s.trim().parse::<i64>().ok() == Some(*n),
            (RecordId::Text(t), Value::String(s)) => s == t,
            (RecordId::Text(t), Value::Number(m)) => m.to_string() == *t,
            _ => false,
        }
    }

    pub fn matches_record(&self, record: &Record) -> bool {
        record.get("id").map_or(false, |v| self.matches(v))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Num(n) => write!(f, "{n}"),
            RecordId::Text(t) => f.write_str(t),
        }
    }
}

/// `local-<digits>-<alnum>`
pub fn is_local_token(s: &str) -> bool {
    let mut parts = s.splitn(3, '-');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some("local"), Some(ts), Some(tok))
            if !ts.is_empty() && ts.chars().all(|c| c.is_ascii_digit())
                && !tok.is_empty() && tok.chars().all(|c| c.is_ascii_alphanumeric())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn local_tokens_have_expected_shape() {
        let t = local_token();
        assert!(is_local_token(&t), "{t}");
        assert!(!is_local_token("local-12a-xyz"));
        assert!(!is_local_token("remote-1-abc"));
        assert!(!is_local_token("local-1-"));
    }

    #[test]
    fn timestamp_ids_skip_past_existing() {
        let future = Utc::now().timestamp_millis() + 60_000;
        let existing = vec![rec(json!({"id": future}))];
        assert_eq!(timestamp_id(&existing).unwrap(), future + 1);
    }

    #[test]
    fn timestamp_ids_refuse_to_wrap_at_max() {
        let existing = vec![rec(json!({"id": i64::MAX}))];
        assert!(matches!(timestamp_id(&existing), Err(ServiceError::Conflict(_))));
        assert!(matches!(IdStrategy::Timestamp.generate(&existing), Err(ServiceError::Conflict(_))));
    }

    #[test]
    fn numeric_and_string_ids_match_each_other() {
        assert!(RecordId::parse("42").matches(&json!(42)));
        assert!(RecordId::parse("42").matches(&json!("42")));
        assert!(RecordId::Text("local-1-a".into()).matches(&json!("local-1-a")));
        assert!(!RecordId::parse("42").matches(&json!(43)));
        assert!(!RecordId::parse("42").matches(&Value::Null));
    }
}

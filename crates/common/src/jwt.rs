//! Unverified JWT payload inspection.
//!
//! Signatures are checked by the backend; the gateway only reads claims to
//! decide how to route and guard requests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

/// Role names understood by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
    Instructor,
}

impl Role {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Student),
            3 => Some(Role::Instructor),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "STUDENT" => Some(Role::Student),
            "INSTRUCTOR" => Some(Role::Instructor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
        }
    }

    /// Parse either a numeric role id or a role name.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().and_then(Role::from_id),
            Value::String(s) => s.trim().parse::<i64>().ok().and_then(Role::from_id).or_else(|| Role::from_name(s)),
            _ => None,
        }
    }
}

/// Decode the claims segment of a `header.payload.signature` token.
/// Any malformed input yields an empty object.
pub fn decode_payload(token: &str) -> Map<String, Value> {
    let token = token.trim().trim_start_matches("Bearer ").trim();
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Map::new();
    }
    let segment = parts[1].trim_end_matches('=');
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(segment) else {
        return Map::new();
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Read the role claim under the names the backend has used over time.
pub fn extract_role(claims: &Map<String, Value>) -> Option<Role> {
    let candidates = [
        claims.get("role"),
        claims.get("user_role"),
        claims.get("roles").and_then(|r| r.get(0)),
        claims.get("user").and_then(|u| u.get("role")),
        claims.get("role_id"),
    ];
    candidates.into_iter().flatten().find_map(Role::from_value)
}

/// Role of the bearer of an `Authorization` header value, if any.
pub fn role_from_authorization(header: &str) -> Option<Role> {
    extract_role(&decode_payload(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn decodes_middle_segment() {
        let claims = decode_payload(&token(json!({"sub": "7", "role": "admin"})));
        assert_eq!(claims.get("sub"), Some(&json!("7")));
    }

    #[test]
    fn malformed_tokens_decode_to_empty() {
        assert!(decode_payload("").is_empty());
        assert!(decode_payload("a.b").is_empty());
        assert!(decode_payload("a.!!!.c").is_empty());
        let not_object = format!("x.{}.y", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(decode_payload(&not_object).is_empty());
    }

    #[test]
    fn padded_segment_is_tolerated() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"role":1}"#);
        let claims = decode_payload(&format!("h.{payload}.s"));
        assert_eq!(extract_role(&claims), Some(Role::Admin));
    }

    #[test]
    fn role_claim_variants() {
        let bearer = format!("Bearer {}", token(json!({"role": 3})));
        assert_eq!(role_from_authorization(&bearer), Some(Role::Instructor));
        assert_eq!(role_from_authorization(&token(json!({"user_role": "student"}))), Some(Role::Student));
        assert_eq!(role_from_authorization(&token(json!({"roles": ["ADMIN"]}))), Some(Role::Admin));
        assert_eq!(role_from_authorization(&token(json!({"user": {"role": "2"}}))), Some(Role::Student));
        assert_eq!(role_from_authorization(&token(json!({"role_id": 1}))), Some(Role::Admin));
        assert_eq!(role_from_authorization(&token(json!({"role": 9}))), None);
    }
}

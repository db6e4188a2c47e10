use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Canonical response envelope returned by every handler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiEnvelope {
    pub fn ok(data: Value) -> Self {
        Self { success: true, data: Some(data), message: None, error: None }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self { success: true, data: None, message: Some(message.into()), error: None }
    }

    pub fn fail(message: impl Into<String>, error: Option<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()), error }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_empty_fields() {
        let v = serde_json::to_value(ApiEnvelope::ok_message("done")).unwrap();
        assert_eq!(v, json!({"success": true, "message": "done"}));
    }

    #[test]
    fn failure_carries_error_detail() {
        let v = serde_json::to_value(ApiEnvelope::fail("Bad Gateway", Some("refused".into()))).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "refused");
        assert!(v.get("data").is_none());
    }
}

use thiserror::Error;

pub mod types;
pub mod utils;
pub mod env;
pub mod backend;
pub mod cache;
pub mod jwt;
pub mod metrics;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream timed out after {0}s")]
    Timeout(u64),
    #[error("parse error: {0}")]
    Parse(String),
}

impl CoreError {
    /// Whether the backend could not be reached at all (as opposed to answering badly).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, CoreError::Network(_) | CoreError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn parse_errors_are_not_unreachable() {
        assert!(CoreError::Network("refused".into()).is_unreachable());
        assert!(CoreError::Timeout(10).is_unreachable());
        assert!(!CoreError::Parse("eof".into()).is_unreachable());
    }
}

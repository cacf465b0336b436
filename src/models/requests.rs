//! Request DTOs for the gateway API

use serde::Deserialize;
use serde_json::Value;

use crate::config::MAX_TTL;

/// Request body for `PUT /cache/:key`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Any JSON value
    pub value: Value,
    /// TTL in seconds; the cache default applies when absent
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if the request is unusable, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.ttl {
            Some(ttl) if ttl == 0 || ttl > MAX_TTL => Some(format!(
                "TTL must be between 1 and {} seconds, got {}",
                MAX_TTL, ttl
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let req: SetRequest = serde_json::from_str(r#"{"value": {"amount": 100}}"#).unwrap();
        assert_eq!(req.value, json!({"amount": 100}));
        assert!(req.ttl.is_none());
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let req: SetRequest = serde_json::from_str(r#"{"value": "hello", "ttl": 60}"#).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_ttl_bounds() {
        let zero = SetRequest {
            value: json!(1),
            ttl: Some(0),
        };
        assert!(zero.validate().is_some());

        let too_long = SetRequest {
            value: json!(1),
            ttl: Some(MAX_TTL + 1),
        };
        assert!(too_long.validate().is_some());

        let max = SetRequest {
            value: json!(1),
            ttl: Some(MAX_TTL),
        };
        assert!(max.validate().is_none());
    }
}

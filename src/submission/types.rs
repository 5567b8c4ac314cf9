//! Submission wire types and outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `POST /api/events` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEventRequest {
    pub event: String,
    pub date: String,
}

/// `POST /api/barcodes` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDetectionRequest {
    pub code: String,
    pub format: String,
    pub event: String,
    pub date: String,
    #[serde(rename = "clientInfo")]
    pub client_info: String,
}

/// `POST /api/barcodes` 2xx response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionAccepted {
    pub id: String,
    pub code: String,
}

/// Outcome of a detection submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Registry stored the detection
    Accepted { id: String },
    /// 400-class response with a field→message map
    ValidationFailed {
        field_errors: BTreeMap<String, String>,
    },
    /// Any other non-success status
    TransportFailed { status: u16 },
    /// Request produced no response at all
    ConnectionFailed,
}

/// Outcome of the event pre-flight registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    ValidationFailed {
        field_errors: BTreeMap<String, String>,
    },
    TransportFailed { status: u16 },
    ConnectionFailed,
}

/// Parse a 400-class body as a field→message map
///
/// The registry answers validation failures with a flat JSON object of
/// string messages. Anything else degrades to a single `error` entry so
/// the operator still sees the raw body.
pub fn field_errors_from_body(body: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(field, message)| {
                let message = match message {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (field, message)
            })
            .collect(),
        _ => {
            let mut map = BTreeMap::new();
            map.insert("error".to_string(), body.to_string());
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_from_object_body() {
        let errors = field_errors_from_body(r#"{"date":"required","event":"too long"}"#);
        assert_eq!(errors.get("date").unwrap(), "required");
        assert_eq!(errors.get("event").unwrap(), "too long");
    }

    #[test]
    fn test_field_errors_from_non_object_body() {
        let errors = field_errors_from_body("Bad Request");
        assert_eq!(errors.get("error").unwrap(), "Bad Request");
    }

    #[test]
    fn test_field_errors_stringifies_non_string_messages() {
        let errors = field_errors_from_body(r#"{"count":3}"#);
        assert_eq!(errors.get("count").unwrap(), "3");
    }

    #[test]
    fn test_client_info_wire_name() {
        let request = SubmitDetectionRequest {
            code: "012345678".to_string(),
            format: "EAN-13".to_string(),
            event: "Conf2024".to_string(),
            date: "2024-05-01".to_string(),
            client_info: "scanpost/0.3.0".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("clientInfo").is_some());
        assert!(json.get("client_info").is_none());
    }
}

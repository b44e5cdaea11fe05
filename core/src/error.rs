//! Error types for the Planning Center client.
//!
//! # Design
//! Client (4xx) and server (5xx) failures carry the decoded response body so
//! callers can inspect the API's `errors` array. Failures that never produced
//! an attributable response land in `Transport`.

use serde_json::Value;

/// Placeholder recorded as the last error when a failure has no response body.
pub const UNKNOWN_FAILURE: &str = "Unknown exception in HTTP request";

/// Errors returned by `PlanningCenter` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A query was executed before a table was selected.
    #[error("no table selected for the request")]
    TableNotSet,

    /// The module name is not one the API exposes.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// The comparison operator has no query-string mapping.
    #[error("unknown where operator: {0}")]
    UnknownOperator(String),

    /// The API rejected the request with a 4xx status.
    #[error("client error HTTP {status}: {body}")]
    Client { status: u16, body: Value },

    /// The API failed with a 5xx status.
    #[error("server error HTTP {status}: {body}")]
    Server { status: u16, body: Value },

    /// The request never produced a usable response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A required credential was absent from the environment.
    #[error("missing environment variable {0}")]
    MissingCredential(&'static str),
}

impl Error {
    /// Returns the HTTP status if the API answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Client { status, .. } | Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The payload recorded for `PlanningCenter::last_error`.
    pub(crate) fn payload(&self) -> Value {
        match self {
            Error::Client { body, .. } | Error::Server { body, .. } => body.clone(),
            Error::Transport(_) => Value::String(UNKNOWN_FAILURE.to_string()),
            other => Value::String(other.to_string()),
        }
    }
}

/// Decode an error response body, keeping non-JSON text as a JSON string.
pub(crate) fn decode_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_body_keeps_json() {
        let body = decode_body(r#"{"errors":[{"status":"404"}]}"#);
        assert_eq!(body, json!({"errors": [{"status": "404"}]}));
    }

    #[test]
    fn decode_body_wraps_plain_text() {
        assert_eq!(decode_body("gateway down"), json!("gateway down"));
    }

    #[test]
    fn transport_payload_is_placeholder() {
        let err = Error::Transport("connection refused".to_string());
        assert_eq!(err.payload(), json!(UNKNOWN_FAILURE));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn not_found_is_detected() {
        let err = Error::Client {
            status: 404,
            body: json!({}),
        };
        assert!(err.is_not_found());
        assert!(!Error::TableNotSet.is_not_found());
    }
}

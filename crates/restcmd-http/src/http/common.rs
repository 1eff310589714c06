//! Wire constants and request/response types shared by the listener and transport

use restcmd::MalformedReply;
use serde::{Deserialize, Serialize};

/// Route on the reply listener that accepts replies.
pub const REPLY_ROUTE: &str = "/response";

/// Fixed body acknowledging a well-formed reply.
pub const REPLY_ACK: &str = "Response received";

/// Header telling the commanded application which port to reply to.
pub const ANSWER_PORT_HEADER: &str = "X-Answer-Port";

/// Header telling the commanded application which host to reply to.
pub const ANSWER_HOST_HEADER: &str = "X-Answer-Host";

#[derive(Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
    pub timestamp: u64,
    pub pending_replies: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(error: &str, message: &str, details: serde_json::Value) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            details: Some(details),
        }
    }
}

impl From<&MalformedReply> for ErrorResponse {
    fn from(err: &MalformedReply) -> Self {
        match err {
            MalformedReply::InvalidJson { .. } => Self::new("invalid_json", &err.to_string()),
            MalformedReply::MissingField { field } => Self::with_details(
                "malformed_reply",
                &err.to_string(),
                serde_json::json!({ "field": field }),
            ),
            MalformedReply::InvalidField { field, expected } => Self::with_details(
                "malformed_reply",
                &err.to_string(),
                serde_json::json!({ "field": field, "expected": expected }),
            ),
        }
    }
}

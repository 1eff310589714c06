//! Mapping of target error responses to transport errors

use super::common::ErrorResponse;
use restcmd::TransportError;

/// Turn a non-success response from the target into a [`TransportError::Rejected`].
///
/// Structured error bodies contribute their message; anything else is kept raw.
pub async fn rejection_from_response(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(error_response) => error_response.message,
            Err(_) => body.trim().to_string(),
        },
        Err(body_error) => format!("failed to read response body: {body_error}"),
    };
    TransportError::Rejected { status, body }
}

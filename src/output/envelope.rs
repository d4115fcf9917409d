//! The JSON error envelope every failure is reported with.

use std::error::Error as StdError;

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::output::encoder::stamp_identification;
use crate::output::writer::{ResponseWriter, TransportBody};
use crate::protocol::names::JSON_CONTENT_TYPE;

pub const INVALID_METHOD: &str = "Invalid method";
pub const BAD_REQUEST: &str = "Bad request";
pub const BODY_READ_FAILED: &str = "Error reading request body";
pub const FUNCTION_FAILED: &str = "Exception in function, consult logs for details";

/// `{"message": ..., "detail": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Envelope for an error raised by user code.
    pub fn function_failed(err: &(dyn StdError + 'static)) -> Self {
        Self::new(FUNCTION_FAILED, describe(err))
    }

    pub fn to_bytes(&self) -> Bytes {
        // A struct of two strings always serializes.
        serde_json::to_vec(self).map(Bytes::from).unwrap_or_default()
    }
}

/// Render an error the way it is reported in `detail`.
pub fn describe(err: &(dyn StdError + 'static)) -> String {
    format!("Error: {err}")
}

/// Build a complete, terminated error response.
pub fn error_response(status: StatusCode, envelope: &ErrorEnvelope) -> Response<TransportBody> {
    let (mut writer, body) = ResponseWriter::channel();
    if let Err(err) = writer.write(envelope.to_bytes()) {
        tracing::warn!(error = %err, "Could not write error envelope");
    }
    writer.end();

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    stamp_identification(headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn serializes_in_field_order() {
        let envelope = ErrorEnvelope::new(INVALID_METHOD, BAD_REQUEST);
        assert_eq!(
            envelope.to_bytes().as_ref(),
            br#"{"message":"Invalid method","detail":"Bad request"}"#
        );
    }

    #[test]
    fn function_failure_detail() {
        let err: Box<dyn StdError + Send + Sync> = "boom".into();
        let envelope = ErrorEnvelope::function_failed(err.as_ref());
        assert_eq!(envelope.message, FUNCTION_FAILED);
        assert_eq!(envelope.detail, "Error: boom");
    }

    #[tokio::test]
    async fn error_response_is_stamped_json() {
        let response = error_response(
            StatusCode::BAD_GATEWAY,
            &ErrorEnvelope::new("m", "d"),
        );
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert!(response.headers().contains_key("fn-fdk-version"));
        assert!(response.headers().contains_key("fn-fdk-runtime"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), br#"{"message":"m","detail":"d"}"#);
    }
}

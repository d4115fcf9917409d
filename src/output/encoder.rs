//! Turns an [`Output`] and the context's response intent into the
//! transport response.
//!
//! Order of work:
//! 1. negotiate JSON vs. verbatim encoding from the content type
//! 2. commit the intent and build the response head
//! 3. write the body by output variant
//! 4. end the body, whatever happened in 3

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};

use crate::context::{Context, ResponseIntent};
use crate::output::result::Output;
use crate::output::writer::{ResponseWriter, TransportBody};
use crate::protocol::names::{FDK_RUNTIME_VALUE, FDK_VERSION_VALUE, JSON_CONTENT_TYPE};

/// Content type and encoding chosen for a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub content_type: Option<String>,
    pub json: bool,
}

/// Decide the content type and whether the value is JSON-encoded.
///
/// Anything non-empty without an explicit content type is JSON.
pub fn negotiate(output: &Output, explicit: Option<&str>) -> Negotiated {
    match explicit {
        None if !output.is_empty() => Negotiated {
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            json: true,
        },
        None => Negotiated {
            content_type: None,
            json: false,
        },
        Some(content_type) => Negotiated {
            content_type: Some(content_type.to_string()),
            json: is_json_content_type(content_type),
        },
    }
}

/// `application/json` or any `+json` suffix, ignoring parameters and case.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == JSON_CONTENT_TYPE || essence.ends_with("+json")
}

/// Encode a successful result. The returned response's body is always
/// terminated: immediately for buffered variants, at end of stream for
/// [`Output::Stream`].
pub fn encode(output: Output, ctx: &Context) -> Response<TransportBody> {
    let negotiated = negotiate(&output, ctx.response_content_type().as_deref());
    let intent = ctx.commit();

    let (mut writer, body) = ResponseWriter::channel();
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    write_head(response.headers_mut(), &intent, negotiated.content_type.as_deref());

    tracing::debug!(
        kind = output.kind(),
        json = negotiated.json,
        content_type = negotiated.content_type.as_deref().unwrap_or("-"),
        "Encoding result"
    );

    let written = match output {
        Output::Stream(stream) => {
            tokio::spawn(stream.pipe_to(writer));
            return response;
        }
        Output::Raw(raw) => raw.write_to(&mut writer),
        Output::Empty => Ok(()),
        other => match body_bytes(other, negotiated.json) {
            Ok(bytes) => writer.write(bytes),
            Err(err) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, err)),
        },
    };
    if let Err(err) = written {
        tracing::error!(error = %err, "Failed to write result");
    }
    writer.end();
    response
}

fn body_bytes(output: Output, json: bool) -> Result<Bytes, serde_json::Error> {
    let bytes: Bytes = match output {
        Output::Text(text) if json => serde_json::to_vec(&text)?.into(),
        Output::Bytes(bytes) if json => serde_json::to_vec(&bytes[..])?.into(),
        Output::Text(text) => text.into(),
        Output::Bytes(bytes) => bytes,
        Output::Json(value) => serde_json::to_vec(&value)?.into(),
        Output::Empty | Output::Raw(_) | Output::Stream(_) => Bytes::new(),
    };
    Ok(bytes)
}

fn write_head(headers: &mut HeaderMap, intent: &ResponseIntent, content_type: Option<&str>) {
    for (name, values) in intent.headers.iter() {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::warn!(header = %name, "Dropping response header with invalid name");
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => tracing::warn!(header = %name, "Dropping invalid response header value"),
            }
        }
    }
    if let Some(content_type) = content_type {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(_) => tracing::warn!(content_type, "Dropping invalid content type"),
        }
    }
    headers.remove(CONTENT_LENGTH);
    stamp_identification(headers);
}

/// Stamp the two identification headers every response carries.
pub(crate) fn stamp_identification(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("fn-fdk-version"),
        HeaderValue::from_static(FDK_VERSION_VALUE),
    );
    headers.insert(
        HeaderName::from_static("fn-fdk-runtime"),
        HeaderValue::from_static(FDK_RUNTIME_VALUE),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::invocation::tests::context_with;
    use futures_util::stream;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_of(response: Response<TransportBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn json_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/jsonl"));
    }

    #[test]
    fn negotiation_rules() {
        let none = negotiate(&Output::Empty, None);
        assert_eq!(none, Negotiated { content_type: None, json: false });

        let defaulted = negotiate(&Output::from("x"), None);
        assert_eq!(defaulted.content_type.as_deref(), Some("application/json"));
        assert!(defaulted.json);

        let explicit = negotiate(&Output::from("x"), Some("text/plain"));
        assert_eq!(explicit.content_type.as_deref(), Some("text/plain"));
        assert!(!explicit.json);
    }

    #[tokio::test]
    async fn structure_defaults_to_json() {
        let ctx = context_with(&[]);
        let response = encode(Output::Json(json!({"x": 1})), &ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_of(response).await, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn plain_string_defaults_to_quoted_json() {
        let ctx = context_with(&[]);
        let response = encode(Output::from("plain"), &ctx);

        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_of(response).await, r#""plain""#);
    }

    #[tokio::test]
    async fn explicit_text_is_verbatim() {
        let ctx = context_with(&[]);
        ctx.set_response_content_type("text/plain");
        let response = encode(Output::from("plain"), &ctx);

        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(body_of(response).await, "plain");
    }

    #[tokio::test]
    async fn empty_writes_nothing() {
        let ctx = context_with(&[]);
        let response = encode(Output::Empty, &ctx);

        assert!(!response.headers().contains_key("content-type"));
        assert_eq!(body_of(response).await, "");
    }

    #[tokio::test]
    async fn raw_ignores_json_marking() {
        let ctx = context_with(&[]);
        let response = encode(Output::raw("not quoted"), &ctx);

        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_of(response).await, "not quoted");
    }

    #[tokio::test]
    async fn head_carries_intent_and_identification() {
        let ctx = context_with(&[]);
        ctx.gateway().set_response_header("X-Foo", "bar");
        ctx.gateway().set_status_code(202);
        ctx.add_response_header("Content-Length", "999");
        let response = encode(Output::Empty, &ctx);

        let headers = response.headers();
        assert_eq!(headers["fn-http-h-x-foo"], "bar");
        assert_eq!(headers["fn-http-status"], "202");
        assert!(!headers.contains_key("content-length"));
        assert_eq!(headers["fn-fdk-version"], FDK_VERSION_VALUE);
        assert_eq!(headers["fn-fdk-runtime"], FDK_RUNTIME_VALUE);
    }

    #[tokio::test]
    async fn commit_freezes_intent() {
        let ctx = context_with(&[]);
        let _response = encode(Output::Empty, &ctx);
        ctx.set_response_header("X-Late", "1");
        assert!(ctx.response_intent().is_committed());
        assert_eq!(ctx.response_header("X-Late"), None);
    }

    #[tokio::test]
    async fn stream_is_piped_until_error() {
        let ctx = context_with(&[]);
        ctx.set_response_content_type("text/plain");
        let chunks = vec![
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
            Err(std::io::Error::other("broken")),
            Ok(Bytes::from_static(b"never")),
        ];
        let response = encode(Output::stream(stream::iter(chunks)), &ctx);

        assert_eq!(body_of(response).await, "ab");
    }
}

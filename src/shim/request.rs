//! Synthetic request handed to middleware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::context::Context;
use crate::protocol::HeaderMap;

/// The gateway request as middleware sees it.
///
/// Cloning shares the same request, including its single-shot body.
#[derive(Debug, Clone)]
pub struct ShimRequest {
    inner: Arc<RequestInner>,
}

#[derive(Debug)]
struct RequestInner {
    method: String,
    url: String,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    consumed: AtomicBool,
}

impl ShimRequest {
    /// Build the request from the gateway view of `ctx`.
    pub fn from_context(ctx: &Context) -> Self {
        let gateway = ctx.gateway();
        let method = gateway.method().unwrap_or("GET").to_ascii_uppercase();
        let url = gateway.request_url().unwrap_or("/").to_string();
        let (path, query) = split_url(&url);

        Self::new(method, url, path, query, gateway.headers(), ctx.raw_body().clone())
    }

    pub(crate) fn new(
        method: String,
        url: String,
        path: String,
        query: Vec<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            inner: Arc::new(RequestInner {
                method,
                url,
                path,
                query,
                headers,
                body,
                consumed: AtomicBool::new(false),
            }),
        }
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// The URL exactly as the gateway sent it.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Decoded query pairs in order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.inner.query
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.inner
            .query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name)
    }

    /// The whole body, independent of [`read`](ShimRequest::read).
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.inner.body)
    }

    /// Read the body as a stream: the first call yields the whole body,
    /// every later call yields `None`.
    pub fn read(&self) -> Option<Bytes> {
        if self.inner.consumed.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(self.inner.body.clone())
        }
    }
}

/// Split a gateway URL, absolute or origin-form, into path and query pairs.
fn split_url(raw: &str) -> (String, Vec<(String, String)>) {
    let parsed = Url::parse(raw).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(raw))
    });
    match parsed {
        Ok(url) => {
            let query = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (url.path().to_string(), query)
        }
        Err(err) => {
            tracing::warn!(url = raw, error = %err, "Unparseable gateway URL");
            (raw.to_string(), Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::invocation::tests::context_with;

    #[test]
    fn absolute_url_is_split() {
        let (path, query) = split_url("https://example.com/orders/7?expand=items&x=a%20b");
        assert_eq!(path, "/orders/7");
        assert_eq!(
            query,
            vec![
                ("expand".to_string(), "items".to_string()),
                ("x".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn origin_form_url_is_split() {
        let (path, query) = split_url("/r/app/fn?q=1");
        assert_eq!(path, "/r/app/fn");
        assert_eq!(query, vec![("q".to_string(), "1".to_string())]);
    }

    #[test]
    fn built_from_gateway_view() {
        let ctx = context_with(&[
            ("Fn-Http-Method", "post"),
            ("Fn-Http-Request-Url", "/items?id=3"),
            ("Fn-Http-H-Accept", "application/json"),
        ]);
        let req = ShimRequest::from_context(&ctx);

        assert_eq!(req.method(), "POST");
        assert_eq!(req.path(), "/items");
        assert_eq!(req.query("id"), Some("3"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert!(req.header("Fn-Http-Method").is_none());
    }

    #[test]
    fn body_is_read_once_then_ends() {
        let req = ShimRequest::new(
            "POST".into(),
            "/".into(),
            "/".into(),
            Vec::new(),
            HeaderMap::new(),
            Bytes::from_static(b"payload"),
        );
        let clone = req.clone();

        assert_eq!(req.read(), Some(Bytes::from_static(b"payload")));
        assert_eq!(clone.read(), None);
        assert_eq!(req.read(), None);
        assert_eq!(req.body().as_ref(), b"payload");
    }
}

//! Per-invocation request snapshot and response intent.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::config::FdkConfig;
use crate::context::gateway::GatewayView;
use crate::context::trace_context::TracingContext;
use crate::invoke::Input;
use crate::protocol::names::{self, CALL_ID, CONTENT_TYPE, DEADLINE, GATEWAY_PREFIX};
use crate::protocol::{canonicalize, HeaderMap};

/// Immutable snapshot of one transport request, built after the body has
/// been read in full.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub headers: HeaderMap,
    pub raw_body: Bytes,
    pub body: Input,
    pub config: Arc<FdkConfig>,
}

/// What user code wants the transport response to carry.
///
/// `Content-Type` is never stored in `headers`; it lives in `content_type`
/// so there is exactly one place to look for it.
#[derive(Debug, Clone, Default)]
pub struct ResponseIntent {
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    committed: bool,
}

impl ResponseIntent {
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

/// Handle to one invocation.
///
/// Cloning is cheap and every clone refers to the same invocation, so a
/// handler may move its context into spawned tasks.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    request: RequestEnvelope,
    response: Mutex<ResponseIntent>,
}

impl Context {
    pub fn new(request: RequestEnvelope) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request,
                response: Mutex::new(ResponseIntent::default()),
            }),
        }
    }

    pub fn config(&self) -> &FdkConfig {
        &self.inner.request.config
    }

    pub fn app_name(&self) -> &str {
        &self.config().app_name
    }

    pub fn app_id(&self) -> &str {
        &self.config().app_id
    }

    pub fn fn_name(&self) -> &str {
        &self.config().fn_name
    }

    pub fn fn_id(&self) -> &str {
        &self.config().fn_id
    }

    /// Memory limit in MiB, 0 when the platform did not say.
    pub fn memory(&self) -> u64 {
        self.config().memory_mb
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header(CALL_ID)
    }

    /// The invocation deadline, if present and well formed.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let raw = self.header(DEADLINE)?;
        DateTime::parse_from_rfc3339(raw)
            .map(|deadline| deadline.with_timezone(&Utc))
            .ok()
    }

    /// Content type of the transport request.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.request.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.request.headers.get(name)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.inner.request.headers.get_all(name)
    }

    /// The decoded request body.
    pub fn body(&self) -> &Input {
        &self.inner.request.body
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.inner.request.raw_body
    }

    pub fn tracing_context(&self) -> TracingContext {
        TracingContext::extract(self.config(), self.headers())
    }

    /// The original gateway request carried inside the sub-protocol.
    pub fn gateway(&self) -> GatewayView<'_> {
        GatewayView::new(self)
    }

    /// Replace a transport response header. `Content-Type`, bare or with
    /// the gateway prefix, goes to the single content type slot.
    pub fn set_response_header(&self, name: &str, value: impl Into<String>) {
        self.mutate(name, |intent, canonical| {
            if is_content_type(canonical) {
                intent.content_type = Some(value.into());
            } else {
                intent.headers.set(canonical, value);
            }
        });
    }

    /// Append a transport response header value.
    pub fn add_response_header(&self, name: &str, value: impl Into<String>) {
        self.mutate(name, |intent, canonical| {
            if is_content_type(canonical) {
                intent.content_type = Some(value.into());
            } else {
                intent.headers.append(canonical, value);
            }
        });
    }

    pub fn remove_response_header(&self, name: &str) {
        self.mutate(name, |intent, canonical| {
            if is_content_type(canonical) {
                intent.content_type = None;
            } else {
                intent.headers.remove(canonical);
            }
        });
    }

    /// First value of a response header.
    pub fn response_header(&self, name: &str) -> Option<String> {
        let canonical = canonicalize(name);
        let intent = self.intent();
        if is_content_type(&canonical) {
            return intent.content_type.clone();
        }
        intent.headers.get(&canonical).map(str::to_string)
    }

    pub fn response_header_values(&self, name: &str) -> Vec<String> {
        let canonical = canonicalize(name);
        let intent = self.intent();
        if is_content_type(&canonical) {
            return intent.content_type.iter().cloned().collect();
        }
        intent.headers.get_all(&canonical).to_vec()
    }

    pub fn set_response_content_type(&self, content_type: impl Into<String>) {
        self.set_response_header(CONTENT_TYPE, content_type);
    }

    pub fn response_content_type(&self) -> Option<String> {
        self.intent().content_type.clone()
    }

    /// Snapshot of the current response intent.
    pub fn response_intent(&self) -> ResponseIntent {
        self.intent().clone()
    }

    /// Freeze the response intent and return what was committed. Later
    /// mutations are ignored.
    pub(crate) fn commit(&self) -> ResponseIntent {
        let mut intent = self.intent();
        intent.committed = true;
        intent.clone()
    }

    fn mutate(&self, name: &str, apply: impl FnOnce(&mut ResponseIntent, &str)) {
        let canonical = canonicalize(name);
        if names::is_identification_header(&canonical) {
            tracing::warn!(header = %canonical, "Ignoring write to reserved response header");
            return;
        }
        let mut intent = self.intent();
        if intent.committed {
            tracing::debug!(header = %canonical, "Response already committed, header change dropped");
            return;
        }
        apply(&mut *intent, &canonical);
    }

    fn intent(&self) -> MutexGuard<'_, ResponseIntent> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Both spellings of the content type share one slot, so a response never
/// carries two competing values.
fn is_content_type(canonical: &str) -> bool {
    canonical == CONTENT_TYPE || canonical.strip_prefix(GATEWAY_PREFIX) == Some(CONTENT_TYPE)
}

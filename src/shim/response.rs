//! Synthetic response handed to middleware.
//!
//! Everything written is buffered; the first `end` (or failure) settles
//! the exchange and later calls are ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::output::envelope::ErrorEnvelope;
use crate::protocol::names::{CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::protocol::{canonicalize, HeaderMap};
use crate::shim::latch::SettleLatch;

/// What a finished middleware response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimOutcome {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// The body was produced by [`ShimResponse::json`].
    pub structured: bool,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Finished(ShimOutcome),
    Failed(String),
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: HeaderMap,
    body: BytesMut,
    structured: bool,
    head_sent: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            structured: false,
            head_sent: false,
        }
    }
}

#[derive(Debug)]
struct ResponseInner {
    state: Mutex<ResponseState>,
    latch: SettleLatch<Settlement>,
}

/// Response object seen by middleware. Clones share state.
#[derive(Debug, Clone)]
pub struct ShimResponse {
    inner: Arc<ResponseInner>,
}

impl Default for ShimResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ShimResponse {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ResponseInner {
                state: Mutex::new(ResponseState::default()),
                latch: SettleLatch::new(),
            }),
        }
    }

    pub fn status(&self) -> u16 {
        self.state().status
    }

    pub fn set_status(&self, status: u16) -> &Self {
        self.update(|state| state.status = status);
        self
    }

    pub fn set_header(&self, name: &str, value: impl Into<String>) -> &Self {
        self.update(|state| state.headers.set(&canonicalize(name), value));
        self
    }

    pub fn append_header(&self, name: &str, value: impl Into<String>) -> &Self {
        self.update(|state| state.headers.append(&canonicalize(name), value));
        self
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.state()
            .headers
            .get(&canonicalize(name))
            .map(str::to_string)
    }

    pub fn remove_header(&self, name: &str) {
        self.update(|state| {
            state.headers.remove(&canonicalize(name));
        });
    }

    /// Set status and headers in one go.
    pub fn write_head<'h>(
        &self,
        status: u16,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
    ) -> &Self {
        self.update(|state| {
            state.status = status;
            for (name, value) in headers {
                state.headers.set(&canonicalize(name), value);
            }
            state.head_sent = true;
        });
        self
    }

    /// Whether the head has been written, explicitly or by a body write.
    pub fn head_sent(&self) -> bool {
        self.state().head_sent
    }

    /// Buffer a body chunk. Returns `false` once the response is finished.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> bool {
        self.update(|state| {
            state.head_sent = true;
            state.body.extend_from_slice(chunk.as_ref());
        })
    }

    /// Serialize `value` as the whole body and finish.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<(), serde_json::Error> {
        let encoded = serde_json::to_vec(value)?;
        self.update(|state| {
            if !state.headers.contains(CONTENT_TYPE) {
                state.headers.set(CONTENT_TYPE, JSON_CONTENT_TYPE);
            }
            state.body.clear();
            state.body.extend_from_slice(&encoded);
            state.structured = true;
        });
        self.end();
        Ok(())
    }

    /// Finish the response.
    pub fn end(&self) {
        let mut state = self.state();
        if self.is_finished() {
            return;
        }
        state.head_sent = true;
        let outcome = ShimOutcome {
            status: state.status,
            headers: state.headers.clone(),
            body: state.body.split().freeze(),
            structured: state.structured,
        };
        if self.inner.latch.settle(Settlement::Finished(outcome)) {
            tracing::trace!("Middleware response ended");
        }
    }

    /// Write a final chunk and finish.
    pub fn end_with(&self, chunk: impl AsRef<[u8]>) {
        self.write(chunk);
        self.end();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.latch.is_settled()
    }

    /// Settle the exchange as failed, unless it already finished.
    pub fn fail(&self, detail: impl Into<String>) {
        let detail = detail.into();
        if !self.inner.latch.settle(Settlement::Failed(detail.clone())) {
            tracing::debug!(%detail, "Middleware failed after response ended, ignoring");
        }
    }

    /// Answer for a request no middleware handled.
    pub(crate) fn fall_through(&self, method: &str, path: &str) {
        if self.is_finished() {
            return;
        }
        let envelope = ErrorEnvelope::new("Not Found", format!("Cannot {method} {path}"));
        self.update(|state| {
            *state = ResponseState {
                status: 404,
                ..ResponseState::default()
            };
            state.headers.set(CONTENT_TYPE, JSON_CONTENT_TYPE);
            state.body.extend_from_slice(&envelope.to_bytes());
            state.structured = true;
        });
        self.end();
    }

    /// Number of live clones of this response.
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// The settlement, if the exchange has ended.
    pub fn settlement(&self) -> Option<&Settlement> {
        self.inner.latch.get()
    }

    /// Wait until the exchange ends.
    pub(crate) async fn settled(&self) -> Settlement {
        self.inner.latch.wait().await.clone()
    }

    /// Apply `change` unless the response is finished.
    fn update(&self, change: impl FnOnce(&mut ResponseState)) -> bool {
        let mut state = self.state();
        if self.is_finished() {
            tracing::debug!("Write after middleware response ended, ignoring");
            return false;
        }
        change(&mut *state);
        true
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

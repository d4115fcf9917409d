//! Values user code can hand back.

use std::fmt;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;

use crate::invoke::BoxError;
use crate::output::writer::ResponseWriter;

/// The result of one invocation. The variant picks the encoding path.
pub enum Output {
    /// Nothing to write.
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(Value),
    /// Bytes written as-is, whatever the content type says.
    Raw(RawResult),
    /// Bytes produced incrementally.
    Stream(StreamResult),
}

impl Output {
    /// Serialize any value into [`Output::Json`].
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Output::Json)
    }

    /// Wrap bytes that must bypass JSON encoding.
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Output::Raw(RawResult::new(bytes))
    }

    /// Wrap a byte stream that is piped to the transport as it yields.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Output::Stream(StreamResult::new(stream))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Empty)
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Output::Empty => "empty",
            Output::Text(_) => "text",
            Output::Bytes(_) => "bytes",
            Output::Json(_) => "json",
            Output::Raw(_) => "raw",
            Output::Stream(_) => "stream",
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Empty => f.write_str("Empty"),
            Output::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Output::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Output::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Output::Raw(raw) => f.debug_tuple("Raw").field(&raw.bytes).finish(),
            Output::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<()> for Output {
    fn from(_: ()) -> Self {
        Output::Empty
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Output::Text(text.to_string())
    }
}

impl From<Bytes> for Output {
    fn from(bytes: Bytes) -> Self {
        Output::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Output {
    fn from(bytes: Vec<u8>) -> Self {
        Output::Bytes(bytes.into())
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Json(value)
    }
}

impl From<RawResult> for Output {
    fn from(raw: RawResult) -> Self {
        Output::Raw(raw)
    }
}

impl From<StreamResult> for Output {
    fn from(stream: StreamResult) -> Self {
        Output::Stream(stream)
    }
}

impl<T: Into<Output>> From<Option<T>> for Output {
    fn from(value: Option<T>) -> Self {
        value.map_or(Output::Empty, Into::into)
    }
}

/// Bytes written verbatim.
#[derive(Debug, Clone)]
pub struct RawResult {
    bytes: Bytes,
}

impl RawResult {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub(crate) fn write_to(self, writer: &mut ResponseWriter) -> Result<(), std::io::Error> {
        writer.write(self.bytes)
    }
}

/// A byte stream piped to the transport.
pub struct StreamResult {
    inner: BoxStream<'static, Result<Bytes, BoxError>>,
}

impl StreamResult {
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            inner: stream.map(|item| item.map_err(Into::into)).boxed(),
        }
    }

    /// Copy every chunk into `writer`, then end it. The stream is only
    /// polled while the transport keeps up. A stream error or a closed
    /// transport stops the copy; the body is ended either way.
    pub(crate) async fn pipe_to(mut self, mut writer: ResponseWriter) {
        while let Some(item) = self.inner.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(err) => {
                    tracing::error!(error = %err, "Result stream failed, ending response");
                    break;
                }
            };
            if let Err(err) = writer.send(chunk).await {
                tracing::warn!(error = %err, "Transport closed while streaming result");
                break;
            }
        }
        writer.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::writer::CHANNEL_DEPTH;
    use futures_util::stream;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn stream_waits_for_slow_transport() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let chunks = stream::iter(0..100u8).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(Bytes::from(vec![i]))
        });

        let (writer, body) = ResponseWriter::channel();
        let pipe = tokio::spawn(StreamResult::new(chunks).pipe_to(writer));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(pulled.load(Ordering::SeqCst) <= CHANNEL_DEPTH + 1);

        let collected = body.collect().await.unwrap().to_bytes();
        pipe.await.unwrap();
        assert_eq!(collected.len(), 100);
        assert_eq!(pulled.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn stream_error_ends_body_early() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Err(BoxError::from("broken")),
            Ok(Bytes::from_static(b"b")),
        ]);
        let (writer, body) = ResponseWriter::channel();
        StreamResult::new(chunks).pipe_to(writer).await;

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"a");
    }
}

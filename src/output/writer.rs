//! Transport response body.
//!
//! The response head is handed to hyper before the body is produced, so
//! the body is fed through a bounded channel. A streamed result waits for
//! the transport to drain the channel before producing more. The
//! channel-backed body never reports an exact size, which makes hyper
//! frame it as chunked and never add a `Content-Length` of its own.

use std::io;

use bytes::Bytes;
use futures_util::stream;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Body type of every transport response.
pub type TransportBody = UnsyncBoxBody<Bytes, io::Error>;

/// Chunks queued ahead of the transport.
pub const CHANNEL_DEPTH: usize = 8;

/// Write half of a [`TransportBody`].
///
/// [`end`](ResponseWriter::end) consumes the writer, so a body is
/// terminated exactly once. Dropping the writer also terminates it.
#[derive(Debug)]
pub struct ResponseWriter {
    tx: mpsc::Sender<Bytes>,
    written: usize,
}

impl ResponseWriter {
    /// Create a connected writer/body pair.
    pub fn channel() -> (Self, TransportBody) {
        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_DEPTH);
        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|chunk| (Ok::<_, io::Error>(Frame::data(chunk)), rx))
        });
        let body = StreamBody::new(frames).boxed_unsync();
        (Self { tx, written: 0 }, body)
    }

    /// Queue a chunk without waiting. Meant for buffered results written
    /// once into a fresh body; fails with `WouldBlock` when the channel is
    /// full and with `BrokenPipe` once the transport stopped reading.
    pub fn write(&mut self, chunk: Bytes) -> Result<(), io::Error> {
        if chunk.is_empty() {
            return Ok(());
        }
        let len = chunk.len();
        self.tx.try_send(chunk).map_err(|err| match err {
            TrySendError::Full(_) => io::Error::new(io::ErrorKind::WouldBlock, "transport body full"),
            TrySendError::Closed(_) => closed(),
        })?;
        self.written += len;
        Ok(())
    }

    /// Queue a chunk, waiting while the transport is behind.
    pub async fn send(&mut self, chunk: Bytes) -> Result<(), io::Error> {
        if chunk.is_empty() {
            return Ok(());
        }
        let len = chunk.len();
        self.tx.send(chunk).await.map_err(|_| closed())?;
        self.written += len;
        Ok(())
    }

    /// Bytes queued so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Terminate the body.
    pub fn end(self) {
        tracing::trace!(bytes = self.written, "Response body ended");
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "transport body closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_then_ends() {
        let (mut writer, body) = ResponseWriter::channel();
        writer.write(Bytes::from_static(b"hello ")).unwrap();
        writer.write(Bytes::new()).unwrap();
        writer.write(Bytes::from_static(b"world")).unwrap();
        assert_eq!(writer.written(), 11);
        writer.end();

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn full_channel_refuses_writes_and_send_waits() {
        let (mut writer, mut body) = ResponseWriter::channel();
        for _ in 0..CHANNEL_DEPTH {
            writer.write(Bytes::from_static(b"x")).unwrap();
        }
        let err = writer.write(Bytes::from_static(b"y")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert_eq!(writer.written(), CHANNEL_DEPTH);

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            writer.send(Bytes::from_static(b"z")),
        )
        .await;
        assert!(pending.is_err());

        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap().as_ref(), b"x");
        writer.send(Bytes::from_static(b"z")).await.unwrap();
        assert_eq!(writer.written(), CHANNEL_DEPTH + 1);
        writer.end();
    }

    #[tokio::test]
    async fn write_after_body_dropped_fails() {
        let (mut writer, body) = ResponseWriter::channel();
        drop(body);
        let err = writer.write(Bytes::from_static(b"x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(writer.send(Bytes::from_static(b"x")).await.is_err());
        writer.end();
    }
}

//! Request body accumulation.
//!
//! The transport delivers the body as a sequence of chunks. An
//! [`Accumulator`] collects them and produces the decoded [`Input`] once the
//! body has ended. Which accumulator runs is chosen by the function's
//! [`InputMode`].

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the request body is decoded before it reaches user code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Parse as JSON, falling back to the raw text.
    #[default]
    Json,
    /// UTF-8 text.
    #[serde(alias = "text")]
    String,
    /// Untouched bytes.
    #[serde(alias = "bytes")]
    Buffer,
}

impl InputMode {
    pub fn accumulator(self) -> Box<dyn Accumulator + Send> {
        match self {
            InputMode::Json => Box::new(JsonAccumulator::default()),
            InputMode::String => Box::new(TextAccumulator::default()),
            InputMode::Buffer => Box::new(RawAccumulator::default()),
        }
    }
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Bytes(Bytes),
    Text(String),
    Json(Value),
}

impl Input {
    /// The body as text, if it was decoded as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Input::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Input::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Input::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Collects body chunks and finalizes exactly once.
pub trait Accumulator {
    fn push(&mut self, chunk: &[u8]);

    fn finish(self: Box<Self>) -> Input;
}

#[derive(Debug, Default)]
pub struct RawAccumulator {
    buf: BytesMut,
}

impl Accumulator for RawAccumulator {
    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    fn finish(self: Box<Self>) -> Input {
        Input::Bytes(self.buf.freeze())
    }
}

/// Decodes at finish so a multi-byte character split across two chunks
/// still decodes correctly.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    buf: Vec<u8>,
}

impl TextAccumulator {
    fn into_text(self) -> String {
        match String::from_utf8(self.buf) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }
}

impl Accumulator for TextAccumulator {
    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    fn finish(self: Box<Self>) -> Input {
        Input::Text(self.into_text())
    }
}

/// Text accumulation followed by a strict JSON parse. Text that does not
/// parse is handed on as [`Input::Text`]; this is never an error.
#[derive(Debug, Default)]
pub struct JsonAccumulator {
    text: TextAccumulator,
}

impl Accumulator for JsonAccumulator {
    fn push(&mut self, chunk: &[u8]) {
        self.text.push(chunk);
    }

    fn finish(self: Box<Self>) -> Input {
        let text = self.text.into_text();
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Input::Json(value),
            Err(err) => {
                tracing::trace!(error = %err, "Body is not JSON, passing text through");
                Input::Text(text)
            }
        }
    }
}

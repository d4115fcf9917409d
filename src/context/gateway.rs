//! The original HTTP gateway request, seen through the sub-protocol.
//!
//! The gateway forwards its request as prefixed headers on the transport
//! request, and reads its response back from prefixed transport response
//! headers. [`GatewayView`] hides the prefixing in both directions.

use crate::context::Context;
use crate::protocol::names::{CONTENT_TYPE, METHOD, REQUEST_URL, STATUS};
use crate::protocol::{canonicalize, decode_gateway_header, encode_gateway_header, HeaderMap};

/// Read/write projection of a [`Context`] onto the gateway request.
#[derive(Debug, Clone, Copy)]
pub struct GatewayView<'a> {
    ctx: &'a Context,
}

impl<'a> GatewayView<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Full URL the gateway was called with.
    pub fn request_url(&self) -> Option<&'a str> {
        self.ctx.header(REQUEST_URL)
    }

    /// Method the gateway was called with.
    pub fn method(&self) -> Option<&'a str> {
        self.ctx.header(METHOD)
    }

    /// Gateway request headers with the prefix removed.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, values) in self.ctx.headers().iter() {
            if let Some(stripped) = decode_gateway_header(name) {
                headers.set_all(&stripped, values.to_vec());
            }
        }
        headers
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.ctx.header(&encode_gateway_header(name))
    }

    pub fn header_values(&self, name: &str) -> &'a [String] {
        self.ctx.header_values(&encode_gateway_header(name))
    }

    /// Replace a gateway response header. `Content-Type` becomes the
    /// response content type instead of a prefixed header.
    pub fn set_response_header(&self, name: &str, value: impl Into<String>) {
        if canonicalize(name) == CONTENT_TYPE {
            self.set_content_type(value);
        } else {
            self.ctx
                .set_response_header(&encode_gateway_header(name), value);
        }
    }

    /// Append a gateway response header value.
    pub fn add_response_header(&self, name: &str, value: impl Into<String>) {
        if canonicalize(name) == CONTENT_TYPE {
            self.set_content_type(value);
        } else {
            self.ctx
                .add_response_header(&encode_gateway_header(name), value);
        }
    }

    pub fn response_header(&self, name: &str) -> Option<String> {
        if canonicalize(name) == CONTENT_TYPE {
            return self.ctx.response_content_type();
        }
        self.ctx.response_header(&encode_gateway_header(name))
    }

    /// Status the gateway should answer with.
    pub fn set_status_code(&self, status: u16) {
        self.ctx.set_response_header(STATUS, status.to_string());
    }

    pub fn status_code(&self) -> Option<u16> {
        self.ctx
            .response_header(STATUS)
            .and_then(|status| status.trim().parse().ok())
    }

    fn set_content_type(&self, value: impl Into<String>) {
        self.ctx.set_response_content_type(value);
    }
}

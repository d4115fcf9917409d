//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use fdk::config::FdkConfig;
use fdk::http::{serve, Function};
use fdk::lifecycle::Shutdown;
use fdk::net::FnListener;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

/// A function served on a fresh socket in the temp directory.
pub struct TestFunction {
    pub socket: PathBuf,
    shutdown: Shutdown,
    server: JoinHandle<()>,
}

impl TestFunction {
    /// Stop accepting and wait for the server to unlink its socket.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.server.await.unwrap();
    }
}

pub fn temp_socket() -> PathBuf {
    std::env::temp_dir().join(format!("fdk-it-{}.sock", uuid::Uuid::new_v4().simple()))
}

pub fn test_config() -> FdkConfig {
    FdkConfig {
        app_name: "shop".into(),
        fn_name: "checkout".into(),
        memory_mb: 128,
        ..FdkConfig::default()
    }
}

/// Bind and serve `function`. The socket is published before this returns.
pub fn start_function(function: Function) -> TestFunction {
    let socket = temp_socket();
    let listener = FnListener::bind(&format!("unix:{}", socket.display())).unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = tokio::spawn(serve(listener, function, Arc::new(test_config()), receiver));
    TestFunction {
        socket,
        shutdown,
        server,
    }
}

pub struct CallResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CallResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Send one raw transport request over the socket.
pub async fn send(socket: &PathBuf, request: Request<Full<Bytes>>) -> CallResponse {
    let stream = UnixStream::connect(socket).await.unwrap();
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(connection);

    let response = sender.send_request(request).await.unwrap();
    let (parts, body) = response.into_parts();
    CallResponse {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}

/// Send a well-formed `POST /call` carrying a gateway request.
pub async fn call(
    socket: &PathBuf,
    method: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> CallResponse {
    let mut request = Request::post("/call")
        .header("Host", "localhost")
        .header("Fn-Call-Id", uuid::Uuid::new_v4().to_string())
        .header("Fn-Http-Method", method)
        .header("Fn-Http-Request-Url", url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = request
        .body(Full::new(Bytes::copy_from_slice(body.as_bytes())))
        .unwrap();
    send(socket, request).await
}

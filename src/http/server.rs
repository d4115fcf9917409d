//! The per-connection dispatch loop.
//!
//! # Responsibilities
//! - Accept connections on the function's listener
//! - Serve each with hyper's HTTP/1 connection, keep-alive off
//! - Validate `POST /call`, decode headers, accumulate the body
//! - Build the invocation context and run user code exactly once
//! - Map every failure to its JSON error envelope
//! - Logging (span per call id) and metrics

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::sync::broadcast;
use tower::Service;
use tracing::Instrument;

use crate::config::{FdkConfig, HandlerOptions};
use crate::context::{Context, RequestEnvelope};
use crate::invoke::{BoxError, Handler, Input, InputMode};
use crate::net::{ConnectionTracker, FnListener};
use crate::observability::metrics::{self, Outcome};
use crate::output::envelope::{
    BAD_REQUEST, BODY_READ_FAILED, FUNCTION_FAILED, INVALID_METHOD,
};
use crate::output::{encode, error_response, ErrorEnvelope, TransportBody};
use crate::protocol::decode_transport;
use crate::protocol::names::CALL_ID;
use crate::shim::{self, Chain, Settlement};

/// The only path the platform calls.
pub const CALL_PATH: &str = "/call";

/// How long shutdown waits for running invocations.
const DRAIN_GRACE: Duration = Duration::from_secs(30);

/// The user code a function runs.
#[derive(Clone)]
pub enum Function {
    /// A handler called with the decoded body.
    Handler {
        handler: Arc<dyn Handler>,
        options: HandlerOptions,
    },
    /// A middleware chain run against the gateway request.
    Middleware(Chain),
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Handler { options, .. } => f
                .debug_struct("Handler")
                .field("options", options)
                .finish_non_exhaustive(),
            Function::Middleware(chain) => f.debug_tuple("Middleware").field(chain).finish(),
        }
    }
}

impl Function {
    pub fn handler(handler: impl Handler) -> Self {
        Self::with_options(handler, HandlerOptions::default())
    }

    pub fn with_options(handler: impl Handler, options: HandlerOptions) -> Self {
        Function::Handler {
            handler: Arc::new(handler),
            options,
        }
    }

    pub fn middleware(chain: Chain) -> Self {
        Function::Middleware(chain)
    }

    /// Middleware reads the body itself, so it gets the bytes untouched.
    fn input_mode(&self) -> InputMode {
        match self {
            Function::Handler { options, .. } => options.input_mode,
            Function::Middleware(_) => InputMode::Buffer,
        }
    }
}

/// `tower::Service` turning one transport request into one response.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    function: Arc<Function>,
    config: Arc<FdkConfig>,
}

impl Dispatcher {
    pub fn new(function: Function, config: Arc<FdkConfig>) -> Self {
        Self {
            function: Arc::new(function),
            config,
        }
    }

    /// Handle one transport request. Never fails: every error becomes an
    /// envelope response.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Response<TransportBody>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Into<BoxError>,
    {
        let started = Instant::now();

        if request.method() != Method::POST || request.uri().path() != CALL_PATH {
            tracing::warn!(
                method = %request.method(),
                path = request.uri().path(),
                "Rejecting request outside the call route"
            );
            metrics::record_invocation(Outcome::Rejected, started);
            return error_response(
                StatusCode::BAD_REQUEST,
                &ErrorEnvelope::new(INVALID_METHOD, BAD_REQUEST),
            );
        }

        let (parts, body) = request.into_parts();
        let headers = decode_transport(parts.headers.iter().map(|(name, value)| {
            (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        }));

        let span = tracing::info_span!(
            "invocation",
            call_id = headers.get(CALL_ID).unwrap_or("-"),
        );

        async move {
            let (raw_body, input) = match accumulate(body, self.function.input_mode()).await {
                Ok(read) => read,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to read request body");
                    metrics::record_invocation(Outcome::BodyError, started);
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &ErrorEnvelope::new(BODY_READ_FAILED, err.to_string()),
                    );
                }
            };

            let ctx = Context::new(RequestEnvelope {
                headers,
                raw_body,
                body: input,
                config: self.config.clone(),
            });
            tracing::debug!(
                deadline = ?ctx.deadline(),
                body_bytes = ctx.raw_body().len(),
                "Invocation started"
            );

            let response = self.run(&ctx, started).await;
            tracing::debug!(
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Invocation finished"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn run(&self, ctx: &Context, started: Instant) -> Response<TransportBody> {
        match &*self.function {
            Function::Handler { handler, .. } => {
                let call = handler.call(ctx.body().clone(), ctx.clone());
                let completed = match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(panic_message(panic).into()),
                };
                match completed {
                    Ok(output) => {
                        metrics::record_invocation(Outcome::Success, started);
                        encode(output, ctx)
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Function failed");
                        metrics::record_invocation(Outcome::FunctionError, started);
                        error_response(
                            StatusCode::BAD_GATEWAY,
                            &ErrorEnvelope::function_failed(err.as_ref()),
                        )
                    }
                }
            }
            Function::Middleware(chain) => match shim::run_exchange(chain, ctx).await {
                Settlement::Finished(outcome) => {
                    metrics::record_invocation(Outcome::Success, started);
                    encode(shim::into_output(outcome, ctx), ctx)
                }
                Settlement::Failed(detail) => {
                    metrics::record_invocation(Outcome::MiddlewareError, started);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        &ErrorEnvelope::new(FUNCTION_FAILED, detail),
                    )
                }
            },
        }
    }
}

impl<B> Service<Request<B>> for Dispatcher
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<TransportBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(request).await) })
    }
}

/// Read the body frame by frame, keeping the raw bytes next to the
/// decoded input.
async fn accumulate<B>(
    mut body: B,
    mode: InputMode,
) -> Result<(Bytes, Input), BoxError>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    let mut accumulator = mode.accumulator();
    let mut raw = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(Into::into)?;
        if let Ok(chunk) = frame.into_data() {
            accumulator.push(&chunk);
            raw.extend_from_slice(&chunk);
        }
    }
    Ok((raw.freeze(), accumulator.finish()))
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("function panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("function panicked: {message}")
    } else {
        "function panicked".to_string()
    }
}

/// Accept connections until `shutdown` fires, then wait for running
/// invocations to finish.
pub async fn serve(
    listener: FnListener,
    function: Function,
    config: Arc<FdkConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let dispatcher = Dispatcher::new(function, config);
    let tracker = ConnectionTracker::new();

    tracing::info!(
        socket = %listener.socket_path().display(),
        "Function ready for invocations"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Shutdown signal received, no longer accepting");
                break;
            }
            accepted = listener.accept() => {
                let (stream, id) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::warn!(error = %err, "Accept failed");
                        continue;
                    }
                };
                let guard = tracker.track(id);
                let service = TowerToHyperService::new(dispatcher.clone());
                tokio::spawn(async move {
                    metrics::record_connection_opened();
                    let connection = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(TokioIo::new(stream), service);
                    if let Err(err) = connection.await {
                        tracing::debug!(connection_id = %guard.id(), error = %err, "Connection ended with error");
                    }
                    metrics::record_connection_closed();
                    drop(guard);
                });
            }
        }
    }

    drop(listener);
    if !tracker.wait_idle(DRAIN_GRACE).await {
        tracing::warn!(
            active = tracker.active_count(),
            "Invocations still running after drain grace"
        );
    }
    tracing::info!("Server stopped");
}

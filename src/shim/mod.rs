//! Runs socket-style middleware against a buffered request/response pair.
//!
//! # Data Flow
//! ```text
//! Context → ShimRequest ─┐
//!                        ├→ Chain (spawned) → ShimResponse buffer
//! ShimResponse ──────────┘                        │
//!                                                 ▼
//!                           SettleLatch: end | fall-through 404 | chain error
//!                                                 │
//!                                                 ▼
//!                           into_output → Output → Result Encoder
//! ```
//!
//! # Design Decisions
//! - The exchange awaits the latch, not the chain, so middleware may end
//!   the response from a task it spawned
//! - The first settlement wins; errors after `end` are only logged

pub mod chain;
pub mod latch;
pub mod request;
pub mod response;

pub use chain::{Chain, Middleware, Next};
pub use latch::SettleLatch;
pub use request::ShimRequest;
pub use response::{Settlement, ShimOutcome, ShimResponse};

use crate::context::Context;
use crate::output::encoder::is_json_content_type;
use crate::output::envelope::describe;
use crate::output::Output;
use crate::protocol::names::{BINARY_CONTENT_TYPE, CONTENT_TYPE};

/// Drive `chain` for one invocation and wait until the exchange settles.
///
/// A chain that returns without ending the response is answered with the
/// fall-through 404 once no other handle to the response is left. While a
/// task the middleware spawned still holds one, the exchange keeps waiting
/// for it to end the response.
pub async fn run_exchange(chain: &Chain, ctx: &Context) -> Settlement {
    let req = ShimRequest::from_context(ctx);
    let res = ShimResponse::new();
    let (method, path) = (req.method().to_string(), req.path().to_string());

    let driver = tokio::spawn(chain.start(req, res.clone()));
    let watcher = res.clone();
    tokio::spawn(async move {
        match driver.await {
            // The finished task has dropped its handles, so only `res` and
            // `watcher` remain unless user code kept a clone.
            Ok(Ok(())) if !watcher.is_finished() && watcher.handle_count() <= 2 => {
                tracing::warn!(%method, %path, "Middleware returned without ending the response");
                watcher.fall_through(&method, &path);
            }
            Ok(Ok(())) if !watcher.is_finished() => {
                tracing::warn!("Middleware returned without ending the response, waiting for end");
            }
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(error = %err, "Middleware chain failed");
                watcher.fail(describe(err.as_ref()));
            }
            Err(err) => {
                tracing::error!(error = %err, "Middleware task aborted");
                watcher.fail(describe(&err));
            }
        }
    });

    res.settled().await
}

/// Move a finished shim response into the context and pick the result
/// value the encoder should write.
pub fn into_output(outcome: ShimOutcome, ctx: &Context) -> Output {
    let gateway = ctx.gateway();
    gateway.set_status_code(outcome.status);
    for (name, values) in outcome.headers.iter() {
        for value in values {
            gateway.add_response_header(name, value.as_str());
        }
    }

    let declared = outcome.headers.get(CONTENT_TYPE);
    let looks_json = declared.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if outcome.structured || looks_json {
        return match serde_json::from_slice(&outcome.body) {
            Ok(value) => Output::Json(value),
            Err(err) => {
                tracing::debug!(error = %err, "Middleware body is not JSON, sending raw");
                Output::raw(outcome.body)
            }
        };
    }

    if declared.is_none() {
        ctx.set_response_content_type(BINARY_CONTENT_TYPE);
    }
    Output::raw(outcome.body)
}

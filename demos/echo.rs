//! Echo function: returns the decoded body and a few facts about the call.
//!
//! Run with `FN_LISTENER=unix:/tmp/echo.sock cargo run --example echo`,
//! then `cargo run --bin fdk-call -- -s /tmp/echo.sock -d '{"hi":1}'`.

use fdk::{BoxError, Context, Input, Output};
use serde_json::json;

async fn echo(input: Input, ctx: Context) -> Result<Output, BoxError> {
    let gateway = ctx.gateway();
    gateway.set_response_header("X-Echoed-By", ctx.fn_name());

    let body = match input {
        Input::Json(value) => value,
        Input::Text(text) => json!(text),
        Input::Bytes(bytes) => json!(bytes.len()),
    };
    Ok(Output::Json(json!({
        "call_id": ctx.call_id(),
        "method": gateway.method(),
        "url": gateway.request_url(),
        "deadline": ctx.deadline().map(|d| d.to_rfc3339()),
        "body": body,
    })))
}

#[tokio::main]
async fn main() -> Result<(), fdk::FdkError> {
    fdk::handle(echo).await
}

//! A small router written as middleware.
//!
//! Requests to `/hello` are answered, `/slow` ends the response from a
//! spawned task, and everything else falls through to 404.

use fdk::{BoxError, Chain, Next, ShimRequest, ShimResponse};
use serde_json::json;

async fn log_request(req: ShimRequest, _res: ShimResponse, next: Next) -> Result<(), BoxError> {
    tracing::info!(method = req.method(), path = req.path(), "Gateway request");
    next.run().await
}

async fn hello(req: ShimRequest, res: ShimResponse, next: Next) -> Result<(), BoxError> {
    if req.path() != "/hello" {
        return next.run().await;
    }
    let name = req.query("name").unwrap_or("world").to_string();
    res.json(&json!({ "greeting": format!("hello {name}") }))?;
    Ok(())
}

async fn slow(req: ShimRequest, res: ShimResponse, next: Next) -> Result<(), BoxError> {
    if req.path() != "/slow" {
        return next.run().await;
    }
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        res.set_header("content-type", "text/plain");
        res.end_with("done eventually");
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), fdk::FdkError> {
    let chain = Chain::new().with(log_request).with(hello).with(slow);
    fdk::handle_middleware(chain).await
}

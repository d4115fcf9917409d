//! Middleware chains served end to end.

use fdk::http::Function;
use fdk::{BoxError, Chain, Next, ShimRequest, ShimResponse};
use http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn error_after_end_does_not_change_response() {
    let chain = Chain::new().with(|_req, res: ShimResponse, _next| async move {
        res.set_status(202).set_header("X-Step", "end");
        res.end_with("accepted");
        Err::<(), BoxError>("too late".into())
    });
    let function = common::start_function(Function::middleware(chain));

    let response = common::call(&function.socket, "GET", "/jobs", &[], "").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("fn-http-status"), Some("202"));
    assert_eq!(response.header("fn-http-h-x-step"), Some("end"));
    assert_eq!(response.header("content-type"), Some("application/octet-stream"));
    assert_eq!(response.body.as_ref(), b"accepted");
    function.stop().await;
}

#[tokio::test]
async fn fall_through_is_not_found() {
    let chain = Chain::new().with(|_req, _res, next: Next| next.run());
    let function = common::start_function(Function::middleware(chain));

    let response = common::call(&function.socket, "POST", "/nowhere?x=1", &[], "").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("fn-http-status"), Some("404"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(
        response.json(),
        json!({"message": "Not Found", "detail": "Cannot POST /nowhere"})
    );
    function.stop().await;
}

#[tokio::test]
async fn return_without_end_is_not_found() {
    let chain = Chain::new().with(|_req, _res, _next| async { Ok::<(), BoxError>(()) });
    let function = common::start_function(Function::middleware(chain));

    let response = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        common::call(&function.socket, "GET", "/silent", &[], ""),
    )
    .await
    .expect("call completes");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("fn-http-status"), Some("404"));
    assert_eq!(
        response.json(),
        json!({"message": "Not Found", "detail": "Cannot GET /silent"})
    );
    function.stop().await;
}

#[tokio::test]
async fn chain_error_is_internal_error() {
    let chain = Chain::new().with(|_req, _res, _next| async { Err("no database") });
    let function = common::start_function(Function::middleware(chain));

    let response = common::call(&function.socket, "GET", "/", &[], "").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({
            "message": "Exception in function, consult logs for details",
            "detail": "Error: no database"
        })
    );
    function.stop().await;
}

#[tokio::test]
async fn json_response_and_request_body() {
    let chain = Chain::new().with(|req: ShimRequest, res: ShimResponse, _next| async move {
        let mut body: serde_json::Value = req.json()?;
        body["seen"] = json!(req.header("x-client").unwrap_or("-"));
        assert!(req.read().is_some());
        assert!(req.read().is_none());
        res.json(&body)?;
        Ok::<_, BoxError>(())
    });
    let function = common::start_function(Function::middleware(chain));

    let response = common::call(
        &function.socket,
        "POST",
        "/orders",
        &[("Fn-Http-H-X-Client", "web")],
        r#"{"id": 7}"#,
    )
    .await;

    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.json(), json!({"id": 7, "seen": "web"}));
    function.stop().await;
}

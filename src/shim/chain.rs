//! Ordered middleware chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::invoke::BoxError;
use crate::shim::request::ShimRequest;
use crate::shim::response::ShimResponse;

pub type MiddlewareFuture = BoxFuture<'static, Result<(), BoxError>>;

/// One step of the chain. It either finishes the response or calls
/// [`Next::run`] to pass the request on.
pub type Middleware =
    Arc<dyn Fn(ShimRequest, ShimResponse, Next) -> MiddlewareFuture + Send + Sync>;

/// An ordered list of middleware run once per invocation.
#[derive(Clone, Default)]
pub struct Chain {
    steps: Arc<Vec<Middleware>>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware function.
    pub fn with<F, Fut, E>(mut self, step: F) -> Self
    where
        F: Fn(ShimRequest, ShimResponse, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let step: Middleware = Arc::new(move |req, res, next| {
            let fut = step(req, res, next);
            Box::pin(async move { fut.await.map_err(Into::into) })
        });
        Arc::make_mut(&mut self.steps).push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Start the chain at its first step.
    pub(crate) fn start(&self, req: ShimRequest, res: ShimResponse) -> MiddlewareFuture {
        Next {
            steps: self.steps.clone(),
            index: 0,
            req,
            res,
        }
        .run()
    }
}

/// Continuation to the rest of the chain.
pub struct Next {
    steps: Arc<Vec<Middleware>>,
    index: usize,
    req: ShimRequest,
    res: ShimResponse,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.steps.len().saturating_sub(self.index))
            .finish()
    }
}

impl Next {
    /// Run the next middleware. Past the last one the request falls
    /// through and is answered with 404.
    pub fn run(self) -> MiddlewareFuture {
        match self.steps.get(self.index).cloned() {
            Some(step) => {
                let next = Next {
                    steps: self.steps,
                    index: self.index + 1,
                    req: self.req.clone(),
                    res: self.res.clone(),
                };
                step(self.req, self.res, next)
            }
            None => {
                tracing::debug!(
                    method = self.req.method(),
                    path = self.req.path(),
                    "No middleware handled the request"
                );
                self.res.fall_through(self.req.method(), self.req.path());
                Box::pin(async { Ok(()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HeaderMap;
    use crate::shim::response::Settlement;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn request() -> ShimRequest {
        ShimRequest::new(
            "GET".into(),
            "/a".into(),
            "/a".into(),
            Vec::new(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (seen.clone(), seen.clone());
        let chain = Chain::new()
            .with(move |_req, _res, next: Next| {
                let seen = first.clone();
                async move {
                    seen.lock().unwrap().push("first");
                    next.run().await
                }
            })
            .with(move |_req, res: ShimResponse, _next| {
                let seen = second.clone();
                async move {
                    seen.lock().unwrap().push("second");
                    res.end_with("done");
                    Ok::<_, BoxError>(())
                }
            });

        let res = ShimResponse::new();
        chain.start(request(), res.clone()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);
        assert!(res.is_finished());
    }

    #[tokio::test]
    async fn empty_chain_falls_through() {
        let res = ShimResponse::new();
        Chain::new().start(request(), res.clone()).await.unwrap();

        match res.settlement() {
            Some(Settlement::Finished(outcome)) => assert_eq!(outcome.status, 404),
            other => panic!("unexpected settlement {other:?}"),
        }
    }

    #[tokio::test]
    async fn errors_propagate_from_steps() {
        let chain = Chain::new().with(|_req, _res, _next| async { Err("bad step") });
        let err = chain
            .start(request(), ShimResponse::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad step");
    }
}

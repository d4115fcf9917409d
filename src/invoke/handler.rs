//! The user-code seam.
//!
//! A [`Handler`] receives the decoded body and the invocation [`Context`]
//! and completes exactly once with an [`Output`] or an error. Any
//! `async` closure of the right shape is a handler; blocking code is
//! wrapped with [`sync_fn`].

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::context::Context;
use crate::invoke::Input;
use crate::output::Output;

/// Error type accepted from user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerFuture = BoxFuture<'static, Result<Output, BoxError>>;

/// Function invoked once per call.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, input: Input, ctx: Context) -> HandlerFuture;
}

impl<F, Fut, O, E> Handler for F
where
    F: Fn(Input, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
    O: Into<Output>,
    E: Into<BoxError>,
{
    fn call(&self, input: Input, ctx: Context) -> HandlerFuture {
        let fut = (self)(input, ctx);
        Box::pin(async move { fut.await.map(Into::into).map_err(Into::into) })
    }
}

/// Adapter for handlers that return without suspending.
pub struct SyncFn<F>(F);

/// Wrap a synchronous function as a [`Handler`].
pub fn sync_fn<F, O, E>(f: F) -> SyncFn<F>
where
    F: Fn(Input, Context) -> Result<O, E> + Send + Sync + 'static,
    O: Into<Output>,
    E: Into<BoxError>,
{
    SyncFn(f)
}

impl<F, O, E> Handler for SyncFn<F>
where
    F: Fn(Input, Context) -> Result<O, E> + Send + Sync + 'static,
    O: Into<Output>,
    E: Into<BoxError>,
{
    fn call(&self, input: Input, ctx: Context) -> HandlerFuture {
        let result = (self.0)(input, ctx).map(Into::into).map_err(Into::into);
        Box::pin(std::future::ready(result))
    }
}

//! Handler types for the Chirp framework.
//!
//! Every callback the dispatcher runs borrows the event's [`Context`]
//! mutably for the duration of one call and returns a boxed future tied to
//! that borrow:
//!
//! ```rust,ignore
//! dispatcher.command("/start", |ctx| Box::pin(async move {
//!     ctx.reply("Welcome").await?;
//!     Ok(())
//! }));
//! ```
//!
//! Registration methods take the closure bound directly (rather than through
//! a helper trait) so the compiler can infer the higher-ranked signature of
//! the closure from the call site.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The result every handler, middleware and scene step returns.
pub type HandlerResult<T = ()> = anyhow::Result<T>;

/// An event handler.
pub type HandlerFn = dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<HandlerFn>;

/// The process-wide error sink, invoked with the error and the event's context.
pub type ErrorHandlerFn =
    dyn for<'a> Fn(anyhow::Error, &'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// A type-erased error handler.
pub type BoxedErrorHandler = Arc<ErrorHandlerFn>;

/// Boxes a handler closure.
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Boxes an error handler closure.
pub fn error_handler_fn<F>(f: F) -> BoxedErrorHandler
where
    F: for<'a> Fn(anyhow::Error, &'a mut Context) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Marks an error returned by the error handler itself.
///
/// Every catch point passes it up untouched; [`crate::Dispatcher::dispatch`]
/// unwraps it before returning, so the error handler runs at most once per
/// event.
#[derive(Debug)]
pub(crate) struct ErrorHandlerFailed(pub(crate) anyhow::Error);

impl std::fmt::Display for ErrorHandlerFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error handler failed: {}", self.0)
    }
}

impl std::error::Error for ErrorHandlerFailed {}

/// Runs the error handler, tagging its failure with [`ErrorHandlerFailed`].
pub(crate) async fn route_error(
    on_error: &ErrorHandlerFn,
    err: anyhow::Error,
    ctx: &mut Context,
) -> HandlerResult {
    ctx.mark_handled();
    on_error(err, ctx)
        .await
        .map_err(|failure| anyhow::Error::new(ErrorHandlerFailed(failure)))
}

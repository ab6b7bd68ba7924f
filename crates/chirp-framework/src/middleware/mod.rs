//! Middleware chain for the Chirp framework.
//!
//! Middleware run in registration order before the handler stage. Each one
//! receives the context and a [`Next`] continuation bound to the following
//! position:
//!
//! ```rust,ignore
//! dispatcher.use_middleware(|ctx, next| Box::pin(async move {
//!     if ctx.chat_id() == "blocked" {
//!         return Ok(()); // short-circuit: nothing downstream runs
//!     }
//!     next.run(ctx).await
//! }));
//! ```
//!
//! # Continuation rules
//!
//! - Not calling `next.run` stops the chain. Later middleware and the
//!   handler stage are skipped.
//! - Each position runs at most once per event. Calling `next.run` a second
//!   time for the same position (or an earlier one) does nothing.
//! - Reaching the end of the chain marks it completed on the context; the
//!   dispatcher only runs handlers for completed chains.
//!
//! # Errors
//!
//! An error returned by a middleware is caught at that middleware's level.
//! With an error handler installed, the handler is invoked with the error and
//! the context, the event is marked handled, and the enclosing middleware sees
//! `Ok(())` from its `next.run`. Without one, the error travels up to the
//! dispatcher. If the error handler fails, its error skips every enclosing
//! level and is returned from the dispatch.

pub mod logger;
pub mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, Ordering};

use tracing::{debug, trace};

use crate::context::Context;
use crate::handler::{
    BoxFuture, ErrorHandlerFailed, ErrorHandlerFn, HandlerResult, route_error,
};

pub use logger::logger;
pub use session::session;

/// A middleware function.
pub type MiddlewareFn =
    dyn for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// A type-erased middleware that can be stored in the chain.
pub type BoxedMiddleware = Arc<MiddlewareFn>;

/// Boxes a middleware closure.
pub fn from_fn<F>(f: F) -> BoxedMiddleware
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// The continuation handed to a middleware.
///
/// `Next` is `Copy`; the position guard lives in the chain run it belongs
/// to, so copies share it.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    entries: &'a [BoxedMiddleware],
    position: usize,
    cursor: &'a AtomicIsize,
    on_error: Option<&'a ErrorHandlerFn>,
}

impl<'a> Next<'a> {
    /// Runs the rest of the chain from this position.
    pub fn run<'b>(self, ctx: &'b mut Context) -> BoxFuture<'b, HandlerResult>
    where
        'a: 'b,
    {
        Box::pin(async move {
            let position = self.position as isize;
            if self.cursor.fetch_max(position, Ordering::SeqCst) >= position {
                trace!(position = self.position, "Continuation already used, ignoring");
                return Ok(());
            }

            let Some(middleware) = self.entries.get(self.position) else {
                trace!("Middleware chain completed");
                ctx.complete_chain();
                return Ok(());
            };

            let next = Next {
                entries: self.entries,
                position: self.position + 1,
                cursor: self.cursor,
                on_error: self.on_error,
            };

            let result = middleware(ctx, next).await;
            match result {
                Ok(()) => Ok(()),
                Err(err) if err.is::<ErrorHandlerFailed>() => Err(err),
                Err(err) => match self.on_error {
                    Some(on_error) => {
                        debug!(
                            position = self.position,
                            error = %err,
                            "Middleware failed, routing to error handler"
                        );
                        route_error(on_error, err, ctx).await
                    }
                    None => Err(err),
                },
            }
        })
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("len", &self.entries.len())
            .finish()
    }
}

/// An ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    entries: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware closure.
    pub fn push<F>(&mut self, f: F)
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.entries.push(Arc::new(f));
    }

    /// Appends a pre-built middleware.
    pub fn push_boxed(&mut self, middleware: BoxedMiddleware) {
        self.entries.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the chain for one event.
    ///
    /// On return, [`Context::is_chain_completed`] tells whether every
    /// middleware passed control on.
    pub async fn run(&self, ctx: &mut Context, on_error: Option<&ErrorHandlerFn>) -> HandlerResult {
        let cursor = AtomicIsize::new(-1);
        let next = Next {
            entries: &self.entries,
            position: 0,
            cursor: &cursor,
            on_error,
        };
        next.run(ctx).await
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.entries.len())
            .finish()
    }
}

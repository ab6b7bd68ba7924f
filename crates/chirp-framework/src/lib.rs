//! # Chirp Framework
//!
//! The dispatch engine of the Chirp bot framework.
//!
//! This layer provides:
//! - [`Context`], the per-event object handed to every callback
//! - [`MiddlewareChain`] with continuation-passing [`Next`]
//! - [`Trigger`]/[`Matcher`] for `command` and `hears` style routing
//! - [`Scene`]/[`SceneManager`] for multi-step conversations
//! - [`Dispatcher`], which ties the above to a session store and a sender
//!
//! Handlers, middleware and scene steps are plain closures returning a boxed
//! future:
//!
//! ```rust,ignore
//! use chirp_framework::prelude::*;
//!
//! let mut dispatcher = Dispatcher::new(sender);
//! dispatcher.use_boxed_middleware(chirp_framework::middleware::logger());
//! dispatcher.hears("hi", |ctx| Box::pin(async move {
//!     ctx.reply("Hello!").await?;
//!     Ok(())
//! }));
//! ```

pub mod context;
pub mod conversation;
pub mod dispatcher;
pub mod handler;
pub mod matcher;
pub mod middleware;
pub mod scene;
pub mod testing;

pub use context::Context;
pub use conversation::{ConversationGuard, ConversationLocks};
pub use dispatcher::Dispatcher;
pub use handler::{
    BoxFuture, BoxedErrorHandler, BoxedHandler, ErrorHandlerFn, HandlerFn, HandlerResult,
    error_handler_fn, handler_fn,
};
pub use matcher::{Commands, Matcher, Trigger, TriggerItem};
pub use middleware::{BoxedMiddleware, MiddlewareChain, MiddlewareFn, Next};
pub use scene::{BoxedStep, Scene, SceneManager, StepFn, StepOutcome};

/// Everything a bot definition usually needs.
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::handler::{BoxFuture, HandlerResult};
    pub use crate::matcher::{Trigger, TriggerItem};
    pub use crate::middleware::{Next, logger, session};
    pub use crate::scene::{Scene, SceneManager, StepOutcome};
}

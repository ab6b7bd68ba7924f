//! Event dispatcher for the Chirp framework.
//!
//! The [`Dispatcher`] owns every registration (middleware, handlers, the
//! error handler) and drives one inbound event through the pipeline:
//!
//! 1. Build a [`Context`] from the sender, the raw event and its `from` field
//! 2. Load the conversation's session (empty if none was stored)
//! 3. Run the middleware chain
//! 4. Resolve the event category (`text`/`interactive` → `message`)
//! 5. If the chain completed, run the category's matchers in registration
//!    order, stopping once the event is handled
//! 6. Persist the session
//!
//! Any error from steps 2–6 goes to the error handler when one is
//! registered; otherwise it is returned to the caller. A failing event never
//! persists its session.
//!
//! ```rust,ignore
//! use chirp_framework::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new(sender);
//! dispatcher
//!     .command("/start", |ctx| Box::pin(async move {
//!         ctx.reply("Welcome").await?;
//!         Ok(())
//!     }))
//!     .on("image", |ctx| Box::pin(async move {
//!         ctx.reply("Nice picture").await?;
//!         Ok(())
//!     }));
//!
//! let dispatcher = Arc::new(dispatcher);
//! dispatcher.dispatch(event).await?;
//! ```
//!
//! Registration takes `&mut self`; once the dispatcher is shared behind an
//! `Arc` it is read-only.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{Instrument, debug, info_span, trace, warn};

use chirp_core::{
    BoxedSender, BoxedSessionStore, EventCategory, InboundEvent, MemorySessionStore,
    OutgoingMessage, SendResult,
};

use crate::context::Context;
use crate::conversation::ConversationLocks;
use crate::handler::{
    BoxFuture, BoxedErrorHandler, ErrorHandlerFailed, HandlerResult, route_error,
};
use crate::matcher::{Commands, Matcher, Trigger};
use crate::middleware::{BoxedMiddleware, MiddlewareChain, Next};

/// The central event dispatcher.
pub struct Dispatcher {
    sender: BoxedSender,
    store: BoxedSessionStore,
    middleware: MiddlewareChain,
    routes: HashMap<EventCategory, Vec<Matcher>>,
    error_handler: Option<BoxedErrorHandler>,
    locks: Option<ConversationLocks>,
}

impl Dispatcher {
    /// Creates a dispatcher that replies through `sender` and keeps sessions
    /// in memory.
    pub fn new(sender: BoxedSender) -> Self {
        Self {
            sender,
            store: Arc::new(MemorySessionStore::new()),
            middleware: MiddlewareChain::new(),
            routes: HashMap::new(),
            error_handler: None,
            locks: Some(ConversationLocks::new()),
        }
    }

    /// Replaces the session store.
    pub fn with_session_store(mut self, store: BoxedSessionStore) -> Self {
        self.store = store;
        self
    }

    /// Turns per-conversation sequencing on or off (on by default).
    ///
    /// With sequencing off, two events of one conversation dispatched
    /// concurrently both read the same stored session and the last persist
    /// wins.
    pub fn serialize_conversations(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(ConversationLocks::new);
        self
    }

    pub fn sender(&self) -> &BoxedSender {
        &self.sender
    }

    pub fn session_store(&self) -> &BoxedSessionStore {
        &self.store
    }

    // ─── Registration ─────────────────────────────────────────────────────────

    /// Appends a middleware closure.
    pub fn use_middleware<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.middleware.push(f);
        self
    }

    /// Appends a pre-built middleware, such as a scene manager's.
    pub fn use_boxed_middleware(&mut self, middleware: BoxedMiddleware) -> &mut Self {
        self.middleware.push_boxed(middleware);
        self
    }

    /// Registers a handler that runs for every event of `category` not yet
    /// handled.
    pub fn on<F>(&mut self, category: impl Into<EventCategory>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.add(category, Matcher::always(Arc::new(f)))
    }

    /// Registers a handler for messages whose text equals one of `commands`.
    pub fn command<F>(&mut self, commands: impl Into<Commands>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        let trigger = Trigger::from(commands.into());
        self.add(EventCategory::Message, Matcher::triggered(trigger, Arc::new(f)))
    }

    /// Registers a handler for messages matching `trigger`.
    pub fn hears<F>(&mut self, trigger: impl Into<Trigger>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.add(EventCategory::Message, Matcher::triggered(trigger, Arc::new(f)))
    }

    /// Adds a pre-built matcher under `category`.
    pub fn add(&mut self, category: impl Into<EventCategory>, matcher: Matcher) -> &mut Self {
        self.routes.entry(category.into()).or_default().push(matcher);
        self
    }

    /// Installs the error handler. A second call replaces the first.
    pub fn catch<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(anyhow::Error, &'a mut Context) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(f));
        self
    }

    /// Returns the number of handlers registered under `category`.
    pub fn handler_count(&self, category: &EventCategory) -> usize {
        self.routes.get(category).map_or(0, Vec::len)
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    // ─── Dispatch ─────────────────────────────────────────────────────────────

    /// Sends a message outside of any event.
    pub async fn send_message(&self, to: &str, message: impl Into<OutgoingMessage>) -> SendResult {
        self.sender.send_message(to, message.into()).await
    }

    /// Dispatches one event through the pipeline.
    pub async fn dispatch(&self, event: InboundEvent) -> HandlerResult {
        let span = info_span!(
            "dispatch",
            chat_id = %event.from,
            event_type = %event.kind,
        );
        self.dispatch_inner(event).instrument(span).await
    }

    /// Dispatches a batch of events concurrently.
    ///
    /// Results are returned in input order.
    pub async fn dispatch_batch(
        &self,
        events: impl IntoIterator<Item = InboundEvent>,
    ) -> Vec<HandlerResult> {
        join_all(events.into_iter().map(|event| self.dispatch(event))).await
    }

    async fn dispatch_inner(&self, event: InboundEvent) -> HandlerResult {
        let chat_id = event.from.clone();
        let category = event.category();

        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&chat_id).await),
            None => None,
        };

        let mut ctx = Context::new(Arc::clone(&self.sender), event, chat_id);

        let result = match self.run_pipeline(&mut ctx, &category).await {
            Ok(()) => Ok(()),
            Err(err) if err.is::<ErrorHandlerFailed>() => Err(err),
            Err(err) => match &self.error_handler {
                Some(on_error) => {
                    warn!(error = %err, "Dispatch failed, invoking error handler");
                    route_error(&**on_error, err, &mut ctx).await
                }
                None => Err(err),
            },
        };

        result.map_err(|err| match err.downcast::<ErrorHandlerFailed>() {
            Ok(ErrorHandlerFailed(inner)) => inner,
            Err(err) => err,
        })
    }

    async fn run_pipeline(&self, ctx: &mut Context, category: &EventCategory) -> HandlerResult {
        let chat_id = ctx.chat_id().to_owned();

        let session = self.store.get(&chat_id).await?.unwrap_or_default();
        trace!(keys = session.len(), "Loaded session");
        ctx.replace_session(session);

        self.middleware
            .run(ctx, self.error_handler.as_deref())
            .await?;

        if ctx.is_chain_completed() {
            self.run_handlers(ctx, category).await?;
        } else {
            debug!("Middleware chain stopped early, skipping handlers");
        }

        self.store.set(&chat_id, ctx.session()).await?;
        trace!(handled = ctx.is_handled(), "Persisted session");
        Ok(())
    }

    async fn run_handlers(&self, ctx: &mut Context, category: &EventCategory) -> HandlerResult {
        let Some(matchers) = self.routes.get(category) else {
            trace!(category = %category, "No handlers for category");
            return Ok(());
        };

        for matcher in matchers {
            if ctx.is_handled() {
                break;
            }
            matcher.execute(ctx).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("middleware", &self.middleware.len())
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|(category, matchers)| (category.as_str(), matchers.len()))
                    .collect::<HashMap<_, _>>(),
            )
            .field("error_handler", &self.error_handler.is_some())
            .field("serialize_conversations", &self.locks.is_some())
            .finish()
    }
}

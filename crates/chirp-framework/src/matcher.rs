//! Text triggers and matchers.
//!
//! A [`Matcher`] pairs a handler with an optional [`Trigger`]. The dispatcher
//! keeps matchers per event category and tries them in registration order
//! until one of them claims the event.
//!
//! # Triggers
//!
//! | Registration | Accepts |
//! |--------------|---------|
//! | `command` | one string or a list of strings, exact equality |
//! | `hears` | a string, a [`Regex`], or a list mixing both |
//! | `on` | no trigger, the handler always runs |
//!
//! ```rust,ignore
//! use chirp_framework::{Trigger, TriggerItem};
//! use regex::Regex;
//!
//! dispatcher.command(["/start", "/help"], on_start);
//! dispatcher.hears(Regex::new(r"(?i)^hello")?, on_greeting);
//! dispatcher.hears(
//!     vec![TriggerItem::from("hi"), TriggerItem::from(Regex::new("test")?)],
//!     on_mixed,
//! );
//! ```
//!
//! A triggered matcher marks the event handled *before* its handler runs, so
//! at most one triggered matcher fires per event.

use regex::Regex;
use tracing::{debug, trace};

use crate::context::Context;
use crate::handler::{BoxedHandler, HandlerResult};

/// One element of a trigger list.
#[derive(Debug, Clone)]
pub enum TriggerItem {
    /// Matches when the text equals this string.
    Literal(String),
    /// Matches when the pattern finds a match anywhere in the text.
    Pattern(Regex),
}

impl TriggerItem {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == text,
            Self::Pattern(pattern) => pattern.is_match(text),
        }
    }
}

impl From<&str> for TriggerItem {
    fn from(literal: &str) -> Self {
        Self::Literal(literal.to_owned())
    }
}

impl From<String> for TriggerItem {
    fn from(literal: String) -> Self {
        Self::Literal(literal)
    }
}

impl From<Regex> for TriggerItem {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

/// What a matcher's text has to look like.
#[derive(Debug, Clone)]
pub enum Trigger {
    Literal(String),
    Pattern(Regex),
    /// Tried in order; the first matching element wins.
    AnyOf(Vec<TriggerItem>),
}

impl Trigger {
    /// Returns `true` if `text` satisfies this trigger.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == text,
            Self::Pattern(pattern) => pattern.is_match(text),
            Self::AnyOf(items) => items.iter().any(|item| item.matches(text)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Literal(literal) => literal.clone(),
            Self::Pattern(pattern) => format!("/{}/", pattern.as_str()),
            Self::AnyOf(items) => format!("any of {} triggers", items.len()),
        }
    }
}

impl From<TriggerItem> for Trigger {
    fn from(item: TriggerItem) -> Self {
        match item {
            TriggerItem::Literal(literal) => Self::Literal(literal),
            TriggerItem::Pattern(pattern) => Self::Pattern(pattern),
        }
    }
}

impl From<&str> for Trigger {
    fn from(literal: &str) -> Self {
        Self::Literal(literal.to_owned())
    }
}

impl From<String> for Trigger {
    fn from(literal: String) -> Self {
        Self::Literal(literal)
    }
}

impl From<Regex> for Trigger {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Vec<TriggerItem>> for Trigger {
    fn from(items: Vec<TriggerItem>) -> Self {
        Self::AnyOf(items)
    }
}

impl From<Vec<Regex>> for Trigger {
    fn from(patterns: Vec<Regex>) -> Self {
        Self::AnyOf(patterns.into_iter().map(TriggerItem::Pattern).collect())
    }
}

impl From<Vec<&str>> for Trigger {
    fn from(literals: Vec<&str>) -> Self {
        Self::AnyOf(literals.into_iter().map(TriggerItem::from).collect())
    }
}

impl From<Vec<String>> for Trigger {
    fn from(literals: Vec<String>) -> Self {
        Self::AnyOf(literals.into_iter().map(TriggerItem::Literal).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Trigger {
    fn from(literals: [&str; N]) -> Self {
        Self::AnyOf(literals.into_iter().map(TriggerItem::from).collect())
    }
}

/// Exact-match command names, as accepted by `command`.
///
/// Only strings convert into `Commands`; patterns belong to `hears`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commands(Vec<String>);

impl Commands {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Commands {
    fn from(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }
}

impl From<String> for Commands {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<&str>> for Commands {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for Commands {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl<const N: usize> From<[&str; N]> for Commands {
    fn from(names: [&str; N]) -> Self {
        Self(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<Commands> for Trigger {
    fn from(commands: Commands) -> Self {
        match <[String; 1]>::try_from(commands.0) {
            Ok([name]) => Self::Literal(name),
            Err(names) => Self::AnyOf(names.into_iter().map(TriggerItem::Literal).collect()),
        }
    }
}

/// A handler with an optional text trigger.
#[derive(Clone)]
pub struct Matcher {
    trigger: Option<Trigger>,
    handler: BoxedHandler,
    name: Option<String>,
}

impl Matcher {
    /// Creates a matcher that runs `handler` for every event it sees.
    pub fn always(handler: BoxedHandler) -> Self {
        Self {
            trigger: None,
            handler,
            name: None,
        }
    }

    /// Creates a matcher that only runs `handler` when the text matches.
    pub fn triggered(trigger: impl Into<Trigger>, handler: BoxedHandler) -> Self {
        let trigger = trigger.into();
        Self {
            name: Some(trigger.describe()),
            trigger: Some(trigger),
            handler,
        }
    }

    /// Sets a name for this matcher (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name of this matcher, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger.as_ref()
    }

    /// Checks whether this matcher would fire for the context.
    pub fn matches(&self, ctx: &Context) -> bool {
        match &self.trigger {
            None => true,
            Some(trigger) => match ctx.text() {
                Some(text) if !ctx.is_handled() => trigger.matches(text),
                _ => false,
            },
        }
    }

    /// Runs the handler if the matcher fires.
    ///
    /// Returns `true` if the handler was invoked.
    pub async fn execute(&self, ctx: &mut Context) -> HandlerResult<bool> {
        let name = self.name.as_deref().unwrap_or("unnamed");
        if !self.matches(ctx) {
            trace!(matcher = name, "Matcher check failed, skipping");
            return Ok(false);
        }

        if self.trigger.is_some() {
            ctx.mark_handled();
        }
        debug!(matcher = name, "Matcher check passed, executing handler");
        (self.handler)(ctx).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("trigger", &self.trigger)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chirp_core::InboundEvent;

    use super::*;
    use crate::handler::handler_fn;
    use crate::testing::RecordingSender;

    fn context(text: &str) -> Context {
        Context::new(
            Arc::new(RecordingSender::new()),
            InboundEvent::text("123", text),
            "123",
        )
    }

    fn counting(counter: &Arc<AtomicUsize>) -> BoxedHandler {
        let counter = Arc::clone(counter);
        handler_fn(move |_ctx| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[test]
    fn test_mixed_trigger_list() {
        let trigger = Trigger::from(vec![
            TriggerItem::from("hi"),
            TriggerItem::from(Regex::new("test").unwrap()),
        ]);

        assert!(trigger.matches("hi"));
        assert!(trigger.matches("this is a test"));
        assert!(!trigger.matches("bye"));
        assert!(!trigger.matches("hi there"));
    }

    #[test]
    fn test_commands_are_exact() {
        let trigger = Trigger::from(Commands::from(["/start", "/help"]));
        assert!(trigger.matches("/start"));
        assert!(trigger.matches("/help"));
        assert!(!trigger.matches("/start now"));
        assert!(!trigger.matches("/START"));

        let single = Trigger::from(Commands::from("/start"));
        assert!(matches!(single, Trigger::Literal(ref s) if s == "/start"));
    }

    #[tokio::test]
    async fn test_match_marks_handled_before_handler() {
        let seen_handled = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&seen_handled);
        let matcher = Matcher::triggered(
            "ping",
            handler_fn(move |ctx| {
                let flag = Arc::clone(&flag);
                Box::pin(async move {
                    if ctx.is_handled() {
                        flag.store(1, Ordering::SeqCst);
                    }
                    Ok(())
                })
            }),
        );

        let mut ctx = context("ping");
        assert!(matcher.execute(&mut ctx).await.unwrap());
        assert_eq!(seen_handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skips_when_already_handled_or_no_text() {
        let counter = Arc::new(AtomicUsize::new(0));
        let matcher = Matcher::triggered(Regex::new(".*").unwrap(), counting(&counter));

        let mut handled = context("anything");
        handled.mark_handled();
        assert!(!matcher.execute(&mut handled).await.unwrap());

        let mut no_text = Context::new(
            Arc::new(RecordingSender::new()),
            InboundEvent::bare("123", "image"),
            "123",
        );
        assert!(!matcher.execute(&mut no_text).await.unwrap());

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_untriggered_matcher_does_not_claim_event() {
        let counter = Arc::new(AtomicUsize::new(0));
        let matcher = Matcher::always(counting(&counter)).name("fallback");
        assert_eq!(matcher.get_name(), Some("fallback"));
        assert!(matcher.trigger().is_none());

        let mut ctx = context("whatever");
        assert!(matcher.execute(&mut ctx).await.unwrap());
        assert!(!ctx.is_handled());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let matcher = Matcher::triggered(
            "boom",
            handler_fn(|_ctx| Box::pin(async move { Err(anyhow::anyhow!("exploded")) })),
        );

        let mut ctx = context("boom");
        let err = matcher.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "exploded");
        assert!(ctx.is_handled());
    }
}

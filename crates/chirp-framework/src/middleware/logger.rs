//! Request timing middleware.

use std::time::Instant;

use tracing::{debug, info};

use super::{BoxedMiddleware, from_fn};

/// Returns a middleware that logs every event and how long its downstream
/// chain took.
///
/// Timing covers the rest of the middleware chain only; the handler stage
/// runs after the chain returns.
pub fn logger() -> BoxedMiddleware {
    from_fn(|ctx, next| {
        Box::pin(async move {
            let started = Instant::now();
            debug!(
                chat_id = %ctx.chat_id(),
                event_type = %ctx.event().kind,
                text = ctx.text().unwrap_or_default(),
                "Incoming event"
            );

            let result = next.run(ctx).await;

            info!(
                chat_id = %ctx.chat_id(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                handled = ctx.is_handled(),
                ok = result.is_ok(),
                "Event passed middleware"
            );
            result
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chirp_core::InboundEvent;

    use super::*;
    use crate::context::Context;
    use crate::middleware::MiddlewareChain;
    use crate::testing::RecordingSender;

    #[tokio::test]
    async fn test_logger_is_transparent() {
        let mut chain = MiddlewareChain::new();
        chain.push_boxed(logger());

        let mut ctx = Context::new(
            Arc::new(RecordingSender::new()),
            InboundEvent::text("123", "hello"),
            "123",
        );
        chain.run(&mut ctx, None).await.unwrap();

        assert!(ctx.is_chain_completed());
        assert!(!ctx.is_handled());
    }
}

//! Session loading middleware.
//!
//! The dispatcher already loads and persists sessions from its own store.
//! This middleware is for chains that keep conversation state somewhere
//! else: it swaps the context's session for the one held by `store`, runs the
//! rest of the chain, and writes the result back.

use chirp_core::BoxedSessionStore;
use tracing::trace;

use super::{BoxedMiddleware, from_fn};

/// Returns a middleware that backs the context's session with `store`.
///
/// The write-back only happens when the downstream chain succeeds.
pub fn session(store: BoxedSessionStore) -> BoxedMiddleware {
    from_fn(move |ctx, next| {
        let store = store.clone();
        Box::pin(async move {
            let chat_id = ctx.chat_id().to_owned();
            let loaded = store.get(&chat_id).await?.unwrap_or_default();
            trace!(chat_id = %chat_id, keys = loaded.len(), "Loaded session");
            ctx.replace_session(loaded);

            next.run(ctx).await?;

            store.set(&chat_id, ctx.session()).await?;
            Ok(())
        })
    })
}

//! Session persistence seam.
//!
//! The dispatcher loads a conversation's [`Session`] at the start of every
//! event and writes it back at the end. Backends are interchangeable:
//!
//! | Backend | Durability |
//! |---------|------------|
//! | [`MemorySessionStore`] | process lifetime |
//! | [`FileSessionStore`] | one JSON file keyed by conversation id |

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::session::Session;

pub use file::{DEFAULT_SESSION_FILE, FileSessionStore};
pub use memory::MemorySessionStore;

/// A type-erased session store.
pub type BoxedSessionStore = Arc<dyn SessionStore>;

/// Key/value persistence for sessions, keyed by conversation identity.
///
/// Implementations must tolerate concurrent calls for different keys.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the session of `id`, or `None` if nothing was stored.
    async fn get(&self, id: &str) -> StoreResult<Option<Session>>;

    /// Replaces the session of `id`.
    async fn set(&self, id: &str, session: &Session) -> StoreResult<()>;

    /// Forgets the session of `id`.
    async fn clear(&self, id: &str) -> StoreResult<()>;
}

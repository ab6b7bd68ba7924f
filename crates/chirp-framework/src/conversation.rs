//! Per-conversation sequencing.
//!
//! Events from the same conversation are dispatched one at a time so the
//! session load → handle → persist span never interleaves with itself.
//! Events from different conversations still run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async locks keyed by conversation identity.
///
/// An entry is removed again as soon as nobody holds or waits for it.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the conversation `id` is free and claims it.
    ///
    /// Dropping the returned future while it waits still releases the
    /// map entry.
    pub async fn acquire(&self, id: &str) -> ConversationGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(id.to_owned())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let entry = EntryRef {
            owner: self,
            id: id.to_owned(),
            lock,
        };

        let guard = {
            let waiting = Arc::clone(&entry.lock).lock_owned();
            waiting.await
        };

        ConversationGuard {
            _guard: guard,
            _entry: entry,
        }
    }

    /// Returns the number of conversations currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// Holds a conversation until dropped.
#[derive(Debug)]
pub struct ConversationGuard<'a> {
    // Released before the entry reference so the count check sees it gone.
    _guard: OwnedMutexGuard<()>,
    _entry: EntryRef<'a>,
}

/// One claim on a map entry, held by a waiter or a holder.
#[derive(Debug)]
struct EntryRef<'a> {
    owner: &'a ConversationLocks,
    id: String,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for EntryRef<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock();
        // One reference in the map, one here: nobody else holds or waits.
        if locks
            .get(&self.id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(entry) == 2)
        {
            locks.remove(&self.id);
        }
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::SessionStore;
use crate::error::StoreResult;
use crate::session::Session;

/// In-memory session store. Sessions live as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored conversations.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn set(&self, id: &str, session: &Session) -> StoreResult<()> {
        self.sessions
            .write()
            .insert(id.to_string(), session.clone());
        Ok(())
    }

    async fn clear(&self, id: &str) -> StoreResult<()> {
        self.sessions.write().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("123").await.unwrap(), None);

        let mut session = Session::new();
        session.insert("lang", "en");
        store.set("123", &session).await.unwrap();

        assert_eq!(store.get("123").await.unwrap(), Some(session));
        assert_eq!(store.get("456").await.unwrap(), None);
        assert_eq!(store.len(), 1);

        store.clear("123").await.unwrap();
        assert!(store.is_empty());
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::SessionStore;
use crate::error::{StoreError, StoreResult};
use crate::session::Session;

/// Default session file name.
pub const DEFAULT_SESSION_FILE: &str = "sessions.json";

/// File-backed session store.
///
/// All conversations share one JSON object on disk, keyed by conversation id.
/// Every `set`/`clear` re-reads the file, applies the change and writes it
/// back through a temporary file and a rename. Writers within this process
/// are serialized; there is no locking across processes.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Opens (or creates) the session file at `path`.
    ///
    /// A missing file is initialised with `{}`.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if tokio::fs::metadata(&path).await.is_err() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, "{}").await?;
            debug!(path = %path.display(), "Created session file");
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StoreResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Malformed {
                path: self.path.display().to_string(),
                reason: format!("expected an object, found {}", json_kind(&other)),
            }),
        }
    }

    async fn write_all(&self, sessions: &Map<String, Value>) -> StoreResult<()> {
        let body = serde_json::to_string_pretty(sessions)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        trace!(path = %self.path.display(), count = sessions.len(), "Wrote session file");
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        let mut sessions = self.read_all().await?;
        match sessions.remove(id) {
            Some(Value::Object(map)) => Ok(Some(Session::from(map))),
            Some(other) => Err(StoreError::Malformed {
                path: self.path.display().to_string(),
                reason: format!("session '{id}' is {}", json_kind(&other)),
            }),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &str, session: &Session) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.read_all().await?;
        sessions.insert(id.to_string(), Value::Object(session.as_map().clone()));
        self.write_all(&sessions).await
    }

    async fn clear(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.read_all().await?;
        if sessions.remove(id).is_some() {
            self.write_all(&sessions).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_creates_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        let store = FileSessionStore::open(&path).await.unwrap();
        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert_eq!(raw, "{}");
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SESSION_FILE);
        let store = FileSessionStore::open(&path).await.unwrap();

        let mut session = Session::new();
        session.set_scene("registration");
        session.set_step(1);
        session.insert("first_name", "Ada");
        store.set("123", &session).await.unwrap();

        let reopened = FileSessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("123").await.unwrap(), Some(session));

        let on_disk: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(on_disk["123"]["__scene"], json!("registration"));
    }

    #[tokio::test]
    async fn test_set_keeps_other_conversations() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::open(dir.path().join(DEFAULT_SESSION_FILE))
            .await
            .unwrap();

        let mut a = Session::new();
        a.insert("n", 1);
        let mut b = Session::new();
        b.insert("n", 2);

        let (ra, rb) = tokio::join!(store.set("a", &a), store.set("b", &b));
        ra.unwrap();
        rb.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(a));
        assert_eq!(store.get("b").await.unwrap(), Some(b));

        store.clear("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SESSION_FILE);
        tokio::fs::write(&path, "[1, 2]").await.unwrap();

        let store = FileSessionStore::open(&path).await.unwrap();
        let err = store.get("123").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}

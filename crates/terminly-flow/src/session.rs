use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use terminly_core::types::{now_unix, Session};
use tokio::sync::Mutex as AsyncMutex;

struct Entry {
    session: Arc<AsyncMutex<Session>>,
    touched: i64,
}

/// In-memory session store keyed by user identifier (phone number,
/// email, or client IP).
///
/// Each entry carries its own async lock; callers hold it for a whole
/// conversational turn, so two near-simultaneous messages from the same
/// key are sequenced instead of racing, while different keys proceed
/// concurrently. Entries idle past the TTL are swept on access, and the
/// oldest-idle entry is dropped once capacity is exceeded.
pub struct SessionStore {
    inner: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl_secs: i64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            capacity,
            ttl_secs,
        }
    }

    /// Fetch the session for `key`, creating a fresh one on first
    /// contact. Marks the entry as touched.
    pub fn get_or_create(&self, key: &str) -> Arc<AsyncMutex<Session>> {
        let now = now_unix();
        let mut map = self.inner.lock().expect("session map poisoned");
        Self::sweep_map(&mut map, now, self.ttl_secs);

        if let Some(entry) = map.get_mut(key) {
            entry.touched = now;
            return Arc::clone(&entry.session);
        }

        if map.len() >= self.capacity {
            Self::evict_oldest(&mut map);
        }

        let session = Arc::new(AsyncMutex::new(Session::new()));
        map.insert(
            key.to_string(),
            Entry {
                session: Arc::clone(&session),
                touched: now,
            },
        );
        session
    }

    /// Replace whatever is stored under `key` with a fresh session.
    /// Used when a new lead arrives for an already-known number.
    pub fn put_fresh(&self, key: &str, session: Session) -> Arc<AsyncMutex<Session>> {
        let now = now_unix();
        let mut map = self.inner.lock().expect("session map poisoned");
        if map.len() >= self.capacity && !map.contains_key(key) {
            Self::evict_oldest(&mut map);
        }

        let session = Arc::new(AsyncMutex::new(session));
        map.insert(
            key.to_string(),
            Entry {
                session: Arc::clone(&session),
                touched: now,
            },
        );
        session
    }

    pub fn remove(&self, key: &str) {
        self.inner
            .lock()
            .expect("session map poisoned")
            .remove(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries idle since before `now - ttl`. Public so tests can
    /// sweep with a synthetic clock.
    pub fn sweep(&self, now: i64) {
        let mut map = self.inner.lock().expect("session map poisoned");
        Self::sweep_map(&mut map, now, self.ttl_secs);
    }

    fn sweep_map(map: &mut HashMap<String, Entry>, now: i64, ttl_secs: i64) {
        map.retain(|_, entry| now - entry.touched <= ttl_secs);
    }

    fn evict_oldest(map: &mut HashMap<String, Entry>) {
        if let Some(key) = map
            .iter()
            .min_by_key(|(_, entry)| entry.touched)
            .map(|(k, _)| k.clone())
        {
            map.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminly_core::types::Stage;

    #[tokio::test]
    async fn test_same_key_same_session() {
        let store = SessionStore::new(10, 3600);
        let a = store.get_or_create("+491701234567");
        a.lock().await.stage = Stage::AwaitingDate;

        let b = store.get_or_create("+491701234567");
        assert_eq!(b.lock().await.stage, Stage::AwaitingDate);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_distinct_sessions() {
        let store = SessionStore::new(10, 3600);
        store.get_or_create("a").lock().await.stage = Stage::Completed;
        let b = store.get_or_create("b");
        assert_eq!(b.lock().await.stage, Stage::Start);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let store = SessionStore::new(2, 3600);
        store.get_or_create("first");
        store.get_or_create("second");
        store.get_or_create("third");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ttl_sweep() {
        let store = SessionStore::new(10, 60);
        store.get_or_create("stale");
        store.sweep(now_unix() + 120);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new(10, 3600);
        store.get_or_create("gone");
        store.remove("gone");
        assert!(store.is_empty());
    }
}

//! Server-side sessions.
//!
//! # Responsibilities
//! - Keep per-visitor string maps keyed by a random id
//! - Carry that id in a cookie
//!
//! # Design Decisions
//! - A session is only created when something is written to it
//! - The id is rotated on login
//! - Sessions live in memory and expire after an idle period
//! - Expired sessions are dropped when next opened, and by a sweep that runs
//!   at most once per idle period

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use dashmap::DashMap;
use uuid::Uuid;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "APPSESSID";

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionData {
    values: HashMap<String, String>,
    last_access: Instant,
}

impl SessionData {
    fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            last_access: Instant::now(),
        }
    }
}

/// All live sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionData>,
    idle_ttl: Duration,
    last_sweep: Mutex<Instant>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Handle for the session named by the request's cookie, if it is live.
    /// Opening a live session counts as an access.
    pub fn open(self: &Arc<Self>, headers: &HeaderMap) -> SessionHandle {
        self.sweep_if_due();

        let id = session_cookie(headers).filter(|id| self.touch(id));
        SessionHandle {
            store: Arc::clone(self),
            state: Arc::new(Mutex::new(HandleState {
                id,
                cookie: CookieChange::None,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Drop every session idle for longer than the TTL.
    fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, data| data.last_access.elapsed() <= ttl);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, live = self.sessions.len(), "Expired sessions removed");
        }
        purged
    }

    /// Refresh `id` if it is live; remove it if it has expired.
    fn touch(&self, id: &Uuid) -> bool {
        match self.sessions.get_mut(id) {
            None => return false,
            Some(mut data) if data.last_access.elapsed() <= self.idle_ttl => {
                data.last_access = Instant::now();
                return true;
            }
            Some(_) => {}
        }
        self.sessions.remove(id);
        false
    }

    fn sweep_if_due(&self) {
        {
            let mut last = self.last_sweep.lock().expect("session sweep mutex poisoned");
            if last.elapsed() < self.idle_ttl {
                return;
            }
            *last = Instant::now();
        }
        self.purge_expired();
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CookieChange {
    None,
    Set,
    Clear,
}

#[derive(Debug)]
struct HandleState {
    id: Option<Uuid>,
    cookie: CookieChange,
}

/// One request's view of its session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    store: Arc<SessionStore>,
    state: Arc<Mutex<HandleState>>,
}

impl SessionHandle {
    pub fn id(&self) -> Option<Uuid> {
        self.lock().id
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let id = self.lock().id?;
        self.store
            .sessions
            .get(&id)
            .and_then(|data| data.values.get(key).cloned())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write `key`, starting a session if there is none.
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        let id = self.ensure();
        self.store
            .sessions
            .entry(id)
            .or_insert_with(|| SessionData::new(HashMap::new()))
            .values
            .insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let id = self.lock().id?;
        self.store
            .sessions
            .get_mut(&id)
            .and_then(|mut data| data.values.remove(key))
    }

    /// Move the data to a fresh id.
    pub fn migrate(&self) {
        let mut state = self.lock();
        let data = state
            .id
            .and_then(|old| self.store.sessions.remove(&old))
            .map(|(_, data)| data.values)
            .unwrap_or_default();

        let id = Uuid::new_v4();
        self.store.sessions.insert(id, SessionData::new(data));
        state.id = Some(id);
        state.cookie = CookieChange::Set;
    }

    /// Drop the session and expire the cookie.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        if let Some(id) = state.id.take() {
            self.store.sessions.remove(&id);
        }
        state.cookie = CookieChange::Clear;
    }

    /// `Set-Cookie` value to send back, if the id changed during the request.
    pub fn set_cookie(&self) -> Option<HeaderValue> {
        let state = self.lock();
        let value = match (state.cookie, state.id) {
            (CookieChange::Set, Some(id)) => {
                format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
            }
            (CookieChange::Clear, _) => {
                format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
            }
            _ => return None,
        };
        HeaderValue::from_str(&value).ok()
    }

    fn ensure(&self) -> Uuid {
        let mut state = self.lock();
        if let Some(id) = state.id {
            return id;
        }
        let id = Uuid::new_v4();
        self.store.sessions.insert(id, SessionData::new(HashMap::new()));
        state.id = Some(id);
        state.cookie = CookieChange::Set;
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HandleState> {
        self.state.lock().expect("session handle mutex poisoned")
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_is_created_on_first_write() {
        let store = Arc::new(SessionStore::new());
        let session = store.open(&HeaderMap::new());
        assert!(session.get("a").is_none());
        assert!(session.set_cookie().is_none());
        assert!(store.is_empty());

        session.insert("a", "1");
        assert_eq!(session.get("a").as_deref(), Some("1"));
        assert_eq!(store.len(), 1);

        let cookie = session.set_cookie().unwrap();
        assert!(cookie.to_str().unwrap().starts_with("APPSESSID="));
    }

    #[test]
    fn test_cookie_reopens_the_session() {
        let store = Arc::new(SessionStore::new());
        let first = store.open(&HeaderMap::new());
        first.insert("user", "alice");
        let id = first.id().unwrap();

        let second = store.open(&cookie_headers(&format!("theme=dark; APPSESSID={id}")));
        assert_eq!(second.get("user").as_deref(), Some("alice"));
        assert!(second.set_cookie().is_none());
        assert_eq!(second.remove("user").as_deref(), Some("alice"));
        assert!(!second.has("user"));
    }

    #[test]
    fn test_unknown_cookie_is_ignored() {
        let store = Arc::new(SessionStore::new());
        let session = store.open(&cookie_headers(&format!("APPSESSID={}", Uuid::new_v4())));
        assert!(session.id().is_none());
    }

    #[test]
    fn test_migrate_keeps_data_under_a_new_id() {
        let store = Arc::new(SessionStore::new());
        let session = store.open(&HeaderMap::new());
        session.insert("k", "v");
        let old = session.id().unwrap();

        session.migrate();
        assert_ne!(session.id().unwrap(), old);
        assert_eq!(session.get("k").as_deref(), Some("v"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_idle_session_is_dropped_when_reopened() {
        let store = Arc::new(SessionStore::with_idle_ttl(Duration::from_millis(100)));
        let session = store.open(&HeaderMap::new());
        session.insert("user", "alice");
        let id = session.id().unwrap();

        std::thread::sleep(Duration::from_millis(150));

        let reopened = store.open(&cookie_headers(&format!("APPSESSID={id}")));
        assert!(reopened.id().is_none());
        assert!(reopened.get("user").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_access_keeps_a_session_alive() {
        let store = Arc::new(SessionStore::with_idle_ttl(Duration::from_millis(300)));
        let session = store.open(&HeaderMap::new());
        session.insert("k", "v");
        let cookie = cookie_headers(&format!("APPSESSID={}", session.id().unwrap()));

        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(store.open(&cookie).get("k").as_deref(), Some("v"));
        }
    }

    #[test]
    fn test_abandoned_sessions_are_swept() {
        let store = Arc::new(SessionStore::with_idle_ttl(Duration::from_millis(100)));
        for _ in 0..50 {
            store.open(&HeaderMap::new()).insert("_security.last_error", "Bad credentials.");
        }
        assert_eq!(store.len(), 50);

        std::thread::sleep(Duration::from_millis(150));

        let fresh = store.open(&HeaderMap::new());
        assert!(fresh.id().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalidate_expires_the_cookie() {
        let store = Arc::new(SessionStore::new());
        let session = store.open(&HeaderMap::new());
        session.insert("k", "v");
        session.invalidate();

        assert!(store.is_empty());
        assert!(session.get("k").is_none());
        assert!(session.set_cookie().unwrap().to_str().unwrap().contains("Max-Age=0"));
    }
}

//! Connection sessions.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// User bound to a session by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub username: String,
}

/// Per-connection state, owned by the connection worker.
#[derive(Debug)]
pub struct Session {
    id: String,
    remote_addr: SocketAddr,
    request_count: u64,
    created_at: Instant,
    connected_at: DateTime<Utc>,
    last_activity: Instant,
    user: Option<AuthenticatedUser>,
}

impl Session {
    pub fn new(remote_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            request_count: 0,
            created_at: now,
            connected_at: Utc::now(),
            last_activity: now,
            user: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Counts a decoded request and refreshes the activity clock.
    pub fn record_request(&mut self) {
        self.request_count += 1;
        self.last_activity = Instant::now();
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn idle_duration(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Records the user of the most recent successful login.
    pub fn set_authenticated_user(&mut self, user: AuthenticatedUser) {
        self.user = Some(user);
    }

    pub fn authenticated_user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Registry snapshot of one live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub remote_addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
    pub user: Option<AuthenticatedUser>,
}

/// Shared view of live sessions across all workers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionInfo>,
    peak: AtomicUsize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session and returns the new active count.
    pub fn register(&self, session: &Session) -> usize {
        self.sessions.insert(
            session.id().to_string(),
            SessionInfo {
                remote_addr: session.remote_addr(),
                connected_at: session.connected_at(),
                user: session.authenticated_user().cloned(),
            },
        );
        let active = self.sessions.len();
        self.peak.fetch_max(active, Ordering::Relaxed);
        active
    }

    /// Removes a session. Returns false if it was not registered.
    pub fn unregister(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn set_user(&self, session_id: &str, user: AuthenticatedUser) {
        if let Some(mut info) = self.sessions.get_mut(session_id) {
            info.user = Some(user);
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|info| info.clone())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Highest concurrent session count seen.
    pub fn peak_count(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.user.is_some())
            .count()
    }

    /// One-line summary for logs.
    pub fn stats(&self) -> String {
        format!(
            "sessions: active={} peak={} authenticated={}",
            self.active_count(),
            self.peak_count(),
            self.authenticated_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:12345".parse().unwrap()
    }

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            username: "alice".into(),
        }
    }

    #[test]
    fn test_new_session() {
        let session = Session::new(test_addr());
        assert_eq!(session.remote_addr(), test_addr());
        assert_eq!(session.request_count(), 0);
        assert!(!session.is_authenticated());
        assert!(Uuid::parse_str(session.id()).is_ok());
    }

    #[test]
    fn test_session_ids_unique() {
        let a = Session::new(test_addr());
        let b = Session::new(test_addr());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_record_request() {
        let mut session = Session::new(test_addr());
        session.record_request();
        session.record_request();
        assert_eq!(session.request_count(), 2);
        assert!(session.idle_duration() <= session.age());
    }

    #[test]
    fn test_authenticated_user_replaced_by_later_login() {
        let mut session = Session::new(test_addr());
        session.set_authenticated_user(alice());
        assert_eq!(session.authenticated_user().unwrap().username, "alice");

        session.set_authenticated_user(AuthenticatedUser {
            user_id: 2,
            username: "bob".into(),
        });
        assert_eq!(session.authenticated_user().unwrap().user_id, 2);
    }

    #[test]
    fn test_registry_counts() {
        let registry = SessionRegistry::new();
        let a = Session::new(test_addr());
        let b = Session::new(test_addr());

        assert_eq!(registry.register(&a), 1);
        assert_eq!(registry.register(&b), 2);
        assert_eq!(registry.peak_count(), 2);

        assert!(registry.unregister(a.id()));
        assert!(!registry.unregister(a.id()));
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.peak_count(), 2);
    }

    #[test]
    fn test_registry_user_tracking() {
        let registry = SessionRegistry::new();
        let session = Session::new(test_addr());
        registry.register(&session);
        assert_eq!(registry.authenticated_count(), 0);

        registry.set_user(session.id(), alice());
        assert_eq!(registry.get(session.id()).unwrap().user, Some(alice()));
        assert_eq!(registry.authenticated_count(), 1);

        // unknown ids are ignored
        registry.set_user("missing", alice());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_registry_stats_line() {
        let registry = SessionRegistry::new();
        let session = Session::new(test_addr());
        registry.register(&session);
        registry.set_user(session.id(), alice());
        assert_eq!(
            registry.stats(),
            "sessions: active=1 peak=1 authenticated=1"
        );
    }
}

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    management::ResponseCache,
    types::{AuthPhase, Credential, PendingLogin},
    utils,
};

#[derive(Debug, Clone)]
struct Session {
    phase: AuthPhase,
    last_seen: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self::with_phase(AuthPhase::Anonymous)
    }

    fn with_phase(phase: AuthPhase) -> Self {
        Self {
            phase,
            last_seen: Utc::now(),
        }
    }
}

/// Server-side sessions keyed by the id stored in the browser cookie.
///
/// A session that has been idle for `ttl` or longer is gone: it is removed on
/// the next access and reads behave as if it never existed. Whenever a session
/// is removed, expires, or loses its credential, its entries in the response
/// cache are dropped with it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: chrono::Duration,
    cache: ResponseCache,
}

impl SessionStore {
    pub fn new(ttl: Duration, cache: ResponseCache) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            cache,
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_seen >= self.ttl
    }

    /// Refreshes `last_seen` of a live session. An expired session is removed
    /// and `None` returned.
    fn touch<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        id: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut Session> {
        let expired = self.is_expired(sessions.get(id)?, now);
        if expired {
            sessions.remove(id);
            self.cache.invalidate_session(id);
            return None;
        }
        let session = sessions.get_mut(id)?;
        session.last_seen = now;
        Some(session)
    }

    /// Returns `id` when it names a live session, otherwise starts a new
    /// anonymous session and returns its id.
    pub async fn ensure(&self, id: Option<&str>) -> String {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        if let Some(id) = id {
            if self.touch(&mut sessions, id, now).is_some() {
                return id.to_string();
            }
        }

        let id = utils::generate_session_id();
        sessions.insert(id.clone(), Session::new());
        id
    }

    /// Current phase of a session; missing and expired sessions are anonymous.
    pub async fn phase(&self, id: &str) -> AuthPhase {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        self.touch(&mut sessions, id, now)
            .map(|session| session.phase.clone())
            .unwrap_or_default()
    }

    /// Moves the session to `PendingCallback`. Any stored credential and cached
    /// data are dropped.
    pub async fn begin_login(&self, id: &str, pending: PendingLogin) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(id.to_string()).or_insert_with(Session::new);
        session.phase = AuthPhase::PendingCallback(pending);
        session.last_seen = Utc::now();
        self.cache.invalidate_session(id);
    }

    /// Takes the pending login of a session, leaving it anonymous.
    ///
    /// Returns `None` when the session is not waiting for a callback. The
    /// pending state can be taken only once.
    pub async fn take_pending(&self, id: &str) -> Option<PendingLogin> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let session = self.touch(&mut sessions, id, now)?;
        match std::mem::take(&mut session.phase) {
            AuthPhase::PendingCallback(pending) => Some(pending),
            other => {
                session.phase = other;
                None
            }
        }
    }

    /// Stores `credential` under `id` as is.
    pub async fn authenticate(&self, id: &str, credential: Credential) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(id.to_string()).or_insert_with(Session::new);
        session.phase = AuthPhase::Authenticated(credential);
        session.last_seen = Utc::now();
    }

    /// Completes a sign-in under a fresh session id.
    ///
    /// The session `previous_id` is removed, so an id known before the login
    /// never carries the credential. Returns the new id to hand to the browser.
    pub async fn sign_in(&self, previous_id: &str, credential: Credential) -> String {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(previous_id).is_some() {
            self.cache.invalidate_session(previous_id);
        }

        let id = utils::generate_session_id();
        sessions.insert(
            id.clone(),
            Session::with_phase(AuthPhase::Authenticated(credential)),
        );
        id
    }

    pub async fn credential(&self, id: &str) -> Option<Credential> {
        match self.phase(id).await {
            AuthPhase::Authenticated(credential) => Some(credential),
            _ => None,
        }
    }

    /// Drops the credential of a session whose token Salesforce rejected.
    pub async fn clear_credential(&self, id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(id) {
            if matches!(session.phase, AuthPhase::Authenticated(_)) {
                session.phase = AuthPhase::Anonymous;
            }
        }
        self.cache.invalidate_session(id);
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        self.cache.invalidate_session(id);
        removed
    }

    /// Removes every expired session and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| self.is_expired(session, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
        }

        let count = expired.len();
        self.cache.invalidate_sessions(expired);
        count
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

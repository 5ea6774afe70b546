use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use dashmap::DashMap;
use seqmgr_core::{SequenceWorkflow, Services};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A UI session driving one sequence workflow instance
pub struct Session {
    pub id: String,
    pub account_id: Uuid,
    pub created_at: Instant,
    last_activity: AtomicU64,
    /// Events for one session are processed one at a time.
    pub workflow: Mutex<SequenceWorkflow>,
}

impl Session {
    fn new(id: String, workflow: SequenceWorkflow) -> Self {
        Self {
            id,
            account_id: workflow.account_id(),
            created_at: Instant::now(),
            last_activity: AtomicU64::new(Self::now_timestamp()),
            workflow: Mutex::new(workflow),
        }
    }

    fn now_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    pub fn touch(&self) {
        self.last_activity.store(Self::now_timestamp(), Ordering::SeqCst);
    }

    pub fn last_activity_secs(&self) -> u64 {
        self.last_activity.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        let last = self.last_activity.load(Ordering::SeqCst);
        let now = Self::now_timestamp();
        now.saturating_sub(last) > timeout.as_secs()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Manages all active sessions
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    services: Services,
    config: StudioConfig,
}

impl SessionManager {
    pub fn new(config: StudioConfig, services: Services) -> Self {
        Self {
            sessions: DashMap::new(),
            services,
            config,
        }
    }

    /// Mount a workflow for the account and register it as a new session
    pub async fn create_session(&self, account_id: Uuid) -> Result<Arc<Session>> {
        if self.sessions.len() >= self.config.max_sessions {
            return Err(StudioError::TooManySessions(self.config.max_sessions));
        }

        let workflow =
            SequenceWorkflow::mount(account_id, self.services.clone(), self.config.workflow.clone())
                .await?;

        let session_id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(session_id.clone(), workflow));
        self.sessions.insert(session_id.clone(), session.clone());

        tracing::info!(session_id = %session_id, account_id = %account_id, "session created");
        Ok(session)
    }

    /// Get a session by ID, updating its last activity time
    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| {
            let session = entry.clone();
            session.touch();
            session
        })
    }

    /// Get a session by ID or fail with `SessionNotFound`
    pub fn require_session(&self, id: &str) -> Result<Arc<Session>> {
        self.get_session(id)
            .ok_or_else(|| StudioError::SessionNotFound(id.to_string()))
    }

    /// Check if a session exists
    pub fn has_session(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Delete a session
    pub fn delete_session(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Get the number of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Clean up expired sessions
    pub fn cleanup_expired(&self) -> usize {
        let timeout = self.config.session_timeout;
        let before = self.sessions.len();

        self.sessions.retain(|_, session| !session.is_expired(timeout));

        before - self.sessions.len()
    }

    /// Get info about all sessions
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let now = Session::now_timestamp();
        self.sessions
            .iter()
            .map(|entry| SessionInfo::of(entry.value(), now))
            .collect()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub account_id: Uuid,
    pub age_secs: u64,
    pub last_activity_secs: u64,
}

impl SessionInfo {
    fn of(session: &Session, now: u64) -> Self {
        Self {
            id: session.id.clone(),
            account_id: session.account_id,
            age_secs: session.age().as_secs(),
            last_activity_secs: now.saturating_sub(session.last_activity_secs()),
        }
    }

    /// Describe a session as of now
    pub fn now(session: &Session) -> Self {
        Self::of(session, Session::now_timestamp())
    }
}

/// Background task to periodically clean up expired sessions
pub async fn cleanup_task(manager: Arc<SessionManager>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let cleaned = manager.cleanup_expired();
        if cleaned > 0 {
            tracing::info!("Cleaned up {} expired sessions", cleaned);
        }
    }
}

//! # Checkout Sessions
//!
//! Server-side record of an issued session and the repository that keeps
//! them. A session id is single-use: once issued it is bound to one order.

use crate::error::{CheckoutError, CheckoutResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Issued, awaiting the customer
    #[default]
    Pending,
    /// Genuine return with a matching result indicator
    Success,
    /// Customer cancelled on the payment page
    Cancelled,
    /// Payment page timed out or failed
    Error,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Success => "success",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued checkout session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub order_id: String,
    /// Token the processor echoes back on a genuine successful return
    pub success_indicator: String,
    #[serde(default)]
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Create a pending session issued now
    pub fn new(
        session_id: impl Into<String>,
        order_id: impl Into<String>,
        success_indicator: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self::issued_at(session_id, order_id, success_indicator, timeout_secs, Utc::now())
    }

    /// Create a pending session issued at `now`
    pub fn issued_at(
        session_id: impl Into<String>,
        order_id: impl Into<String>,
        success_indicator: impl Into<String>,
        timeout_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            order_id: order_id.into(),
            success_indicator: success_indicator.into(),
            status: SessionStatus::Pending,
            created_at: now,
            expires_at: now + Duration::seconds(timeout_secs as i64),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Pending and not yet past its timeout
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal() && !self.is_expired()
    }

    /// Move to a new status. Terminal statuses are final.
    pub fn transition(&mut self, to: SessionStatus) -> CheckoutResult<()> {
        if self.status.is_terminal() {
            return Err(CheckoutError::SessionClosed {
                session_id: self.session_id.clone(),
                status: self.status.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Compare a returned result indicator with the issued one in constant time
    pub fn indicator_matches(&self, candidate: &str) -> bool {
        constant_time_compare(&self.success_indicator, candidate)
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Storage for issued sessions, keyed by session id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Record a newly issued session. Fails if the id was issued before.
    async fn insert(&self, session: CheckoutSession) -> CheckoutResult<()>;

    /// Look a session up by id. Expired sessions are still returned.
    async fn get(&self, session_id: &str) -> CheckoutResult<Option<CheckoutSession>>;

    /// Most recently issued session for an order.
    async fn find_by_order(&self, order_id: &str) -> CheckoutResult<Option<CheckoutSession>>;

    /// Apply a status transition and return the updated record.
    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> CheckoutResult<CheckoutSession>;

    /// Drop records that expired before `cutoff`. Returns how many went.
    async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> CheckoutResult<usize>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, CheckoutSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: CheckoutSession) -> CheckoutResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(CheckoutError::SessionConflict {
                session_id: session.session_id,
            });
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> CheckoutResult<Option<CheckoutSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn find_by_order(&self, order_id: &str) -> CheckoutResult<Option<CheckoutSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.order_id == order_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> CheckoutResult<CheckoutSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CheckoutError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;
        session.transition(status)?;
        Ok(session.clone())
    }

    async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> CheckoutResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > cutoff);
        Ok(before - sessions.len())
    }
}

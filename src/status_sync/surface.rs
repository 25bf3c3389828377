use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

// ============================================================================
// Live Status Surface - contract with the external presentation surface
// ============================================================================
//
// The surface owns its sessions. We only ever hold an opaque id and the last
// payload we pushed.
//
// ============================================================================

/// Opaque session handle issued by the surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content rendered by a live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub item_count: u32,
    pub total_amount: Decimal,
    pub pickup: bool,
    /// When the current status was entered
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusPayload {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            status: order.status(),
            item_count: order.item_count(),
            total_amount: order.amounts().total_amount,
            pickup: order.fulfillment().is_pickup(),
            updated_at: order.status_since(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Live status session limit reached")]
    SessionLimitExceeded,

    #[error("Live status session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Live status surface unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceOp {
    Create,
    Update,
    End,
    List,
}

impl SurfaceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceOp::Create => "create",
            SurfaceOp::Update => "update",
            SurfaceOp::End => "end",
            SurfaceOp::List => "list",
        }
    }
}

#[async_trait]
pub trait LiveStatusSurface: Send + Sync {
    /// Start a new session showing `payload`
    async fn create(&self, payload: &StatusPayload) -> Result<SessionId, SurfaceError>;

    /// Replace the content of an existing session
    async fn update(&self, session: &SessionId, payload: &StatusPayload) -> Result<(), SurfaceError>;

    /// Terminate a session, optionally with a final payload
    async fn end(&self, session: &SessionId, payload: Option<&StatusPayload>) -> Result<(), SurfaceError>;

    /// Sessions currently live on the surface, including ones we lost track of
    async fn live_sessions(&self) -> Result<Vec<SessionId>, SurfaceError>;
}

// ============================================================================
// In-memory surface
// ============================================================================

/// One recorded call against the in-memory surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Create { order_id: Uuid, status: OrderStatus },
    Update { session: SessionId, status: OrderStatus },
    End { session: SessionId, status: Option<OrderStatus> },
    List,
}

impl SurfaceCall {
    pub fn op(&self) -> SurfaceOp {
        match self {
            SurfaceCall::Create { .. } => SurfaceOp::Create,
            SurfaceCall::Update { .. } => SurfaceOp::Update,
            SurfaceCall::End { .. } => SurfaceOp::End,
            SurfaceCall::List => SurfaceOp::List,
        }
    }
}

#[derive(Default)]
struct SurfaceState {
    /// Live sessions in creation order; seeded sessions carry no payload
    sessions: Vec<(SessionId, Option<StatusPayload>)>,
    calls: Vec<SurfaceCall>,
    scripted_failures: HashMap<SurfaceOp, VecDeque<SurfaceError>>,
    next_id: u64,
}

impl SurfaceState {
    fn position(&self, session: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|(id, _)| id == session)
    }

    fn scripted_failure(&mut self, op: SurfaceOp) -> Option<SurfaceError> {
        self.scripted_failures.get_mut(&op)?.pop_front()
    }
}

/// Surface double with a concurrent-session limit and a call log.
///
/// Every call (including scripted failures) is logged once its optional
/// latency has elapsed, so a call dropped mid-flight leaves no trace.
pub struct InMemoryLiveStatusSurface {
    state: Mutex<SurfaceState>,
    max_sessions: usize,
    latency: Option<Duration>,
}

impl Default for InMemoryLiveStatusSurface {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InMemoryLiveStatusSurface {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            state: Mutex::new(SurfaceState::default()),
            max_sessions,
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pretend a session survived from an earlier run
    pub async fn seed_session(&self, id: impl Into<String>) -> SessionId {
        let session = SessionId::new(id);
        self.state.lock().await.sessions.push((session.clone(), None));
        session
    }

    /// Simulate the user dismissing a session outside our control
    pub async fn dismiss(&self, session: &SessionId) -> bool {
        let mut state = self.state.lock().await;
        match state.position(session) {
            Some(index) => {
                state.sessions.remove(index);
                true
            }
            None => false,
        }
    }

    /// Fail the next call of kind `op` with `error`
    pub async fn fail_next(&self, op: SurfaceOp, error: SurfaceError) {
        self.state
            .lock()
            .await
            .scripted_failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub async fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count(&self, op: SurfaceOp) -> usize {
        self.state.lock().await.calls.iter().filter(|c| c.op() == op).count()
    }

    pub async fn live_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn payload_of(&self, session: &SessionId) -> Option<StatusPayload> {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .find(|(id, _)| id == session)
            .and_then(|(_, payload)| payload.clone())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LiveStatusSurface for InMemoryLiveStatusSurface {
    async fn create(&self, payload: &StatusPayload) -> Result<SessionId, SurfaceError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.calls.push(SurfaceCall::Create { order_id: payload.order_id, status: payload.status });

        if let Some(error) = state.scripted_failure(SurfaceOp::Create) {
            return Err(error);
        }
        if state.sessions.len() >= self.max_sessions {
            return Err(SurfaceError::SessionLimitExceeded);
        }

        state.next_id += 1;
        let session = SessionId::new(format!("live-{}", state.next_id));
        state.sessions.push((session.clone(), Some(payload.clone())));
        Ok(session)
    }

    async fn update(&self, session: &SessionId, payload: &StatusPayload) -> Result<(), SurfaceError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.calls.push(SurfaceCall::Update { session: session.clone(), status: payload.status });

        if let Some(error) = state.scripted_failure(SurfaceOp::Update) {
            return Err(error);
        }
        let index = state
            .position(session)
            .ok_or_else(|| SurfaceError::SessionNotFound(session.clone()))?;
        state.sessions[index].1 = Some(payload.clone());
        Ok(())
    }

    async fn end(&self, session: &SessionId, payload: Option<&StatusPayload>) -> Result<(), SurfaceError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.calls.push(SurfaceCall::End {
            session: session.clone(),
            status: payload.map(|p| p.status),
        });

        if let Some(error) = state.scripted_failure(SurfaceOp::End) {
            return Err(error);
        }
        let index = state
            .position(session)
            .ok_or_else(|| SurfaceError::SessionNotFound(session.clone()))?;
        state.sessions.remove(index);
        Ok(())
    }

    async fn live_sessions(&self) -> Result<Vec<SessionId>, SurfaceError> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.calls.push(SurfaceCall::List);

        if let Some(error) = state.scripted_failure(SurfaceOp::List) {
            return Err(error);
        }
        Ok(state.sessions.iter().map(|(id, _)| id.clone()).collect())
    }
}

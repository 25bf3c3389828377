use std::sync::Arc;

use uuid::Uuid;

use crate::domain::order::{active_order, Order, OrderBookSnapshot};
use crate::metrics::Metrics;
use super::surface::{LiveStatusSurface, SessionId, StatusPayload, SurfaceError, SurfaceOp};

// ============================================================================
// Status Sync Bridge
// ============================================================================
//
// Reflects the single active order onto the live status surface.
//
// Reconciliation (one pass per committed order change):
// 1. Active order, nothing tracked  -> adopt a leftover session or create one
// 2. Active order, session tracked  -> update it (never a second create)
// 3. No active order, session tracked -> end it and forget it
// 4. Create hits the session limit  -> end everything live, start clean
//
// Surface failures never reach the order lifecycle; `sync` logs them.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSession {
    pub id: SessionId,
    /// `None` until the first update lands on an adopted session
    pub order_id: Option<Uuid>,
    pub last_payload: Option<StatusPayload>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Created(SessionId),
    /// A leftover live session was taken over; any extra ones were ended
    Adopted { session: SessionId, ended_strays: usize },
    Updated,
    /// The tracked session already shows this payload
    Unchanged,
    Ended,
    /// Nothing active and nothing tracked
    Idle,
    /// The tracked session vanished on the surface; the next pass recreates
    Dropped,
    /// Session limit hit; every live session was ended
    Reset { ended: usize },
}

pub struct StatusSyncBridge {
    surface: Arc<dyn LiveStatusSurface>,
    tracked: Option<TrackedSession>,
    metrics: Option<Arc<Metrics>>,
}

impl StatusSyncBridge {
    pub fn new(surface: Arc<dyn LiveStatusSurface>) -> Self {
        Self {
            surface,
            tracked: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tracked(&self) -> Option<&TrackedSession> {
        self.tracked.as_ref()
    }

    /// Reconcile against a snapshot, logging instead of returning failures
    pub async fn sync(&mut self, snapshot: &OrderBookSnapshot) -> Option<ReconcileOutcome> {
        match self.reconcile(&snapshot.orders).await {
            Ok(outcome) => {
                tracing::debug!(revision = snapshot.revision, outcome = ?outcome, "Status sync pass finished");
                Some(outcome)
            }
            Err(e) => {
                tracing::warn!(revision = snapshot.revision, error = %e, "Status sync pass failed");
                None
            }
        }
    }

    /// One reconciliation pass over the current order collection
    pub async fn reconcile(&mut self, orders: &[Order]) -> Result<ReconcileOutcome, SurfaceError> {
        match active_order(orders) {
            Some(active) => {
                let payload = StatusPayload::from_order(active);
                if self.tracked.is_some() {
                    self.push_update(payload).await
                } else {
                    self.open_session(payload).await
                }
            }
            None => self.end_tracked(orders).await,
        }
    }

    async fn open_session(&mut self, payload: StatusPayload) -> Result<ReconcileOutcome, SurfaceError> {
        let live = self.observe(SurfaceOp::List, self.surface.live_sessions().await)?;

        if let Some((first, strays)) = live.split_first() {
            tracing::info!(session = %first, strays = strays.len(), "Adopting leftover live session");
            let ended_strays = self.end_all(strays).await;
            self.track(TrackedSession {
                id: first.clone(),
                order_id: None,
                last_payload: None,
            });
            return match self.push_update(payload).await? {
                ReconcileOutcome::Dropped => Ok(ReconcileOutcome::Dropped),
                _ => Ok(ReconcileOutcome::Adopted { session: first.clone(), ended_strays }),
            };
        }

        match self.observe(SurfaceOp::Create, self.surface.create(&payload).await) {
            Ok(session) => {
                tracing::info!(session = %session, order_id = %payload.order_id, "Live status session created");
                self.track(TrackedSession {
                    id: session.clone(),
                    order_id: Some(payload.order_id),
                    last_payload: Some(payload),
                });
                Ok(ReconcileOutcome::Created(session))
            }
            Err(SurfaceError::SessionLimitExceeded) => {
                tracing::warn!("Live status session limit reached, ending every live session");
                let live = self.observe(SurfaceOp::List, self.surface.live_sessions().await)?;
                let ended = self.end_all(&live).await;
                self.untrack();
                Ok(ReconcileOutcome::Reset { ended })
            }
            Err(e) => Err(e),
        }
    }

    async fn push_update(&mut self, payload: StatusPayload) -> Result<ReconcileOutcome, SurfaceError> {
        let Some(tracked) = &self.tracked else {
            return Ok(ReconcileOutcome::Idle);
        };
        if tracked.last_payload.as_ref() == Some(&payload) {
            return Ok(ReconcileOutcome::Unchanged);
        }
        let session = tracked.id.clone();

        match self.observe(SurfaceOp::Update, self.surface.update(&session, &payload).await) {
            Ok(()) => {
                tracing::debug!(session = %session, status = %payload.status, "Live status session updated");
                if let Some(tracked) = self.tracked.as_mut() {
                    tracked.order_id = Some(payload.order_id);
                    tracked.last_payload = Some(payload);
                }
                Ok(ReconcileOutcome::Updated)
            }
            Err(SurfaceError::SessionNotFound(_)) => {
                tracing::warn!(session = %session, "Tracked live status session is gone");
                self.untrack();
                Ok(ReconcileOutcome::Dropped)
            }
            Err(e) => Err(e),
        }
    }

    async fn end_tracked(&mut self, orders: &[Order]) -> Result<ReconcileOutcome, SurfaceError> {
        let Some(tracked) = &self.tracked else {
            return Ok(ReconcileOutcome::Idle);
        };
        let session = tracked.id.clone();
        let final_payload = tracked
            .order_id
            .and_then(|id| orders.iter().find(|o| o.id() == id))
            .map(StatusPayload::from_order)
            .or_else(|| tracked.last_payload.clone());

        match self.observe(SurfaceOp::End, self.surface.end(&session, final_payload.as_ref()).await) {
            Ok(()) | Err(SurfaceError::SessionNotFound(_)) => {
                tracing::info!(
                    session = %session,
                    status = ?final_payload.as_ref().map(|p| p.status),
                    "Live status session ended"
                );
                self.untrack();
                Ok(ReconcileOutcome::Ended)
            }
            Err(e) => Err(e),
        }
    }

    /// Best effort; returns how many sessions actually ended
    async fn end_all(&self, sessions: &[SessionId]) -> usize {
        let mut ended = 0;
        for session in sessions {
            match self.observe(SurfaceOp::End, self.surface.end(session, None).await) {
                Ok(()) => ended += 1,
                Err(e) => tracing::warn!(session = %session, error = %e, "Failed to end live session"),
            }
        }
        ended
    }

    fn observe<T>(&self, op: SurfaceOp, result: Result<T, SurfaceError>) -> Result<T, SurfaceError> {
        if let Some(metrics) = &self.metrics {
            metrics.record_surface_call(op.as_str(), result.is_ok());
        }
        result
    }

    fn track(&mut self, session: TrackedSession) {
        self.tracked = Some(session);
        if let Some(metrics) = &self.metrics {
            metrics.status_sync_tracked_sessions.set(1);
        }
    }

    fn untrack(&mut self) {
        self.tracked = None;
        if let Some(metrics) = &self.metrics {
            metrics.status_sync_tracked_sessions.set(0);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{CartCommand, CartState, Product, ProductId};
    use crate::domain::checkout::{PaymentMethod, PaymentMethodType};
    use crate::domain::order::{Fulfillment, NewOrder, OrderLifecycle, OrderStatus};
    use crate::event_sourcing::Aggregate;
    use crate::status_sync::surface::{InMemoryLiveStatusSurface, SurfaceCall};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn cart() -> CartState {
        let product = Product {
            id: ProductId::new("plov").unwrap(),
            name: "Plov".into(),
            price: Decimal::from(90),
            image: None,
        };
        CartState::default()
            .execute(&CartCommand::AddItem { product, modifiers: vec![] })
            .unwrap()
            .0
    }

    fn place(lifecycle: &mut OrderLifecycle) -> Uuid {
        lifecycle
            .create_order(&cart(), NewOrder {
                order_id: Uuid::new_v4(),
                accepted_at: Utc::now(),
                fulfillment: Fulfillment::Pickup,
                payment_method: PaymentMethod {
                    id: Uuid::new_v4(),
                    method_type: PaymentMethodType::Cash,
                    last_four: None,
                },
            })
            .unwrap()
            .aggregate_id
    }

    fn bridge(surface: &Arc<InMemoryLiveStatusSurface>) -> StatusSyncBridge {
        StatusSyncBridge::new(surface.clone())
    }

    #[tokio::test]
    async fn test_full_lifecycle_creates_once_updates_twice_ends_once() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();

        let id = place(&mut lifecycle);
        assert!(matches!(bridge.reconcile(lifecycle.orders()).await, Ok(ReconcileOutcome::Created(_))));

        for status in [OrderStatus::Preparing, OrderStatus::Delivering] {
            lifecycle.advance_status(id, status, Utc::now());
            assert_eq!(bridge.reconcile(lifecycle.orders()).await, Ok(ReconcileOutcome::Updated));
        }

        lifecycle.advance_status(id, OrderStatus::Completed, Utc::now());
        assert_eq!(bridge.reconcile(lifecycle.orders()).await, Ok(ReconcileOutcome::Ended));

        assert_eq!(surface.count(SurfaceOp::Create).await, 1);
        assert_eq!(surface.count(SurfaceOp::Update).await, 2);
        assert_eq!(surface.count(SurfaceOp::End).await, 1);
        assert_eq!(surface.live_count().await, 0);
        assert!(bridge.tracked().is_none());

        let calls = surface.calls().await;
        assert!(matches!(
            calls.last(),
            Some(SurfaceCall::End { status: Some(OrderStatus::Completed), .. })
        ));
    }

    #[tokio::test]
    async fn test_identical_payload_not_resent() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        place(&mut lifecycle);

        bridge.reconcile(lifecycle.orders()).await.unwrap();
        let again = bridge.reconcile(lifecycle.orders()).await.unwrap();

        assert_eq!(again, ReconcileOutcome::Unchanged);
        assert_eq!(surface.count(SurfaceOp::Update).await, 0);
    }

    #[tokio::test]
    async fn test_no_active_order_nothing_tracked_is_silent() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface);

        assert_eq!(bridge.reconcile(&[]).await, Ok(ReconcileOutcome::Idle));
        assert!(surface.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_leftover_sessions_adopted_and_strays_ended() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(3));
        let first = surface.seed_session("left-1").await;
        surface.seed_session("left-2").await;
        surface.seed_session("left-3").await;

        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        let id = place(&mut lifecycle);

        let outcome = bridge.reconcile(lifecycle.orders()).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Adopted { session: first.clone(), ended_strays: 2 });
        assert_eq!(surface.count(SurfaceOp::Create).await, 0);
        assert_eq!(surface.live_count().await, 1);
        assert_eq!(surface.payload_of(&first).await.unwrap().order_id, id);
        assert_eq!(bridge.tracked().unwrap().order_id, Some(id));
    }

    #[tokio::test]
    async fn test_adopted_session_gone_on_first_update_is_dropped() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let leftover = surface.seed_session("left-1").await;
        surface
            .fail_next(SurfaceOp::Update, SurfaceError::SessionNotFound(leftover))
            .await;
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        place(&mut lifecycle);

        let outcome = bridge.reconcile(lifecycle.orders()).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Dropped);
        assert!(bridge.tracked().is_none());
    }

    #[tokio::test]
    async fn test_session_limit_resets_then_next_pass_recreates() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        surface.fail_next(SurfaceOp::Create, SurfaceError::SessionLimitExceeded).await;
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        place(&mut lifecycle);

        let outcome = bridge.reconcile(lifecycle.orders()).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Reset { ended: 0 });
        assert!(bridge.tracked().is_none());

        let outcome = bridge.reconcile(lifecycle.orders()).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Created(_)));
        assert_eq!(surface.live_count().await, 1);
    }

    #[tokio::test]
    async fn test_dismissed_session_is_dropped_and_recreated() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        let id = place(&mut lifecycle);

        let ReconcileOutcome::Created(session) = bridge.reconcile(lifecycle.orders()).await.unwrap() else {
            panic!("expected a created session");
        };
        surface.dismiss(&session).await;

        lifecycle.advance_status(id, OrderStatus::Preparing, Utc::now());
        assert_eq!(bridge.reconcile(lifecycle.orders()).await, Ok(ReconcileOutcome::Dropped));
        assert!(matches!(bridge.reconcile(lifecycle.orders()).await, Ok(ReconcileOutcome::Created(_))));
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_tracking() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface);
        let mut lifecycle = OrderLifecycle::new();
        let id = place(&mut lifecycle);
        bridge.reconcile(lifecycle.orders()).await.unwrap();

        surface
            .fail_next(SurfaceOp::Update, SurfaceError::Unavailable("timeout".into()))
            .await;
        lifecycle.advance_status(id, OrderStatus::Preparing, Utc::now());

        let snapshot = OrderBookSnapshot { revision: 2, orders: lifecycle.orders().to_vec() };
        assert!(bridge.sync(&snapshot).await.is_none());
        assert!(bridge.tracked().is_some());

        assert_eq!(bridge.sync(&snapshot).await, Some(ReconcileOutcome::Updated));
    }

    #[tokio::test]
    async fn test_metrics_follow_surface_calls() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut bridge = bridge(&surface).with_metrics(metrics.clone());
        let mut lifecycle = OrderLifecycle::new();
        let id = place(&mut lifecycle);

        bridge.reconcile(lifecycle.orders()).await.unwrap();
        assert_eq!(metrics.status_sync_tracked_sessions.get(), 1);

        lifecycle.cancel_order(id, None, Utc::now());
        bridge.reconcile(lifecycle.orders()).await.unwrap();

        assert_eq!(metrics.status_sync_tracked_sessions.get(), 0);
        assert_eq!(metrics.status_sync_calls.with_label_values(&["create"]).get(), 1);
        assert_eq!(metrics.status_sync_calls.with_label_values(&["end"]).get(), 1);
        assert_eq!(metrics.status_sync_failures.with_label_values(&["create"]).get(), 0);
    }
}

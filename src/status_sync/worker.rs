use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::order::OrderBookSnapshot;
use super::bridge::StatusSyncBridge;

// ============================================================================
// Status Sync Worker - single-flight reconciliation loop
// ============================================================================
//
// Follows the lifecycle's snapshot channel. At most one pass runs at a time;
// a newer snapshot arriving mid-pass drops the stale pass and starts over from
// the latest one instead of queueing behind it.
//
// When the lifecycle goes away the worker makes sure the latest snapshot was
// reconciled, then returns the bridge.
//
// ============================================================================

enum Pass {
    Finished,
    Superseded,
    SenderGone,
}

pub struct StatusSyncHandle {
    task: JoinHandle<StatusSyncBridge>,
    reconciled: watch::Receiver<u64>,
}

impl StatusSyncHandle {
    /// Revision of the last snapshot a pass completed for
    pub fn reconciled_revision(&self) -> u64 {
        *self.reconciled.borrow()
    }

    /// Wait until a pass has completed for `revision` or a later one.
    ///
    /// Returns `false` if the worker stopped first.
    pub async fn wait_for_revision(&mut self, revision: u64) -> bool {
        self.reconciled.wait_for(|r| *r >= revision).await.is_ok()
    }

    /// Wait for the worker to exit (the lifecycle must be dropped first)
    pub async fn join(self) -> anyhow::Result<StatusSyncBridge> {
        Ok(self.task.await?)
    }
}

pub fn spawn(
    mut bridge: StatusSyncBridge,
    mut snapshots: watch::Receiver<Arc<OrderBookSnapshot>>,
) -> StatusSyncHandle {
    let (reconciled_tx, reconciled) = watch::channel(0u64);

    let task = tokio::spawn(async move {
        tracing::info!("Status sync worker started");
        let mut snapshot = snapshots.borrow_and_update().clone();

        loop {
            let pass = tokio::select! {
                _ = bridge.sync(&snapshot) => Pass::Finished,
                changed = snapshots.changed() => match changed {
                    Ok(()) => Pass::Superseded,
                    Err(_) => Pass::SenderGone,
                },
            };

            match pass {
                Pass::Finished => {
                    reconciled_tx.send_replace(snapshot.revision);
                    if snapshots.changed().await.is_err() {
                        break;
                    }
                    snapshot = snapshots.borrow_and_update().clone();
                }
                Pass::Superseded => {
                    let stale = snapshot.revision;
                    snapshot = snapshots.borrow_and_update().clone();
                    tracing::debug!(
                        stale_revision = stale,
                        revision = snapshot.revision,
                        "Newer order snapshot, superseding in-flight sync pass"
                    );
                }
                Pass::SenderGone => {
                    // the interrupted pass never completed; finish it without racing
                    bridge.sync(&snapshot).await;
                    reconciled_tx.send_replace(snapshot.revision);
                    break;
                }
            }
        }

        tracing::info!(revision = *reconciled_tx.borrow(), "Status sync worker stopped");
        bridge
    });

    StatusSyncHandle { task, reconciled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{CartCommand, CartState, Product, ProductId};
    use crate::domain::checkout::{PaymentMethod, PaymentMethodType};
    use crate::domain::order::{Fulfillment, NewOrder, OrderLifecycle, OrderStatus};
    use crate::event_sourcing::Aggregate;
    use crate::status_sync::surface::{InMemoryLiveStatusSurface, SurfaceOp};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use uuid::Uuid;

    fn place(lifecycle: &mut OrderLifecycle) -> Uuid {
        let product = Product {
            id: ProductId::new("manti").unwrap(),
            name: "Manti".into(),
            price: Decimal::from(70),
            image: None,
        };
        let cart = CartState::default()
            .execute(&CartCommand::AddItem { product, modifiers: vec![] })
            .unwrap()
            .0;
        lifecycle
            .create_order(&cart, NewOrder {
                order_id: Uuid::new_v4(),
                accepted_at: Utc::now(),
                fulfillment: Fulfillment::Pickup,
                payment_method: PaymentMethod {
                    id: Uuid::new_v4(),
                    method_type: PaymentMethodType::Card,
                    last_four: Some("4242".into()),
                },
            })
            .unwrap()
            .aggregate_id
    }

    #[tokio::test]
    async fn test_worker_follows_lifecycle_to_completion() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut lifecycle = OrderLifecycle::new();
        let mut handle = spawn(StatusSyncBridge::new(surface.clone()), lifecycle.subscribe());

        let id = place(&mut lifecycle);
        assert!(handle.wait_for_revision(lifecycle.revision()).await);
        assert_eq!(surface.live_count().await, 1);

        lifecycle.advance_status(id, OrderStatus::Completed, Utc::now());
        assert!(handle.wait_for_revision(lifecycle.revision()).await);
        assert_eq!(surface.live_count().await, 0);

        drop(lifecycle);
        let bridge = handle.join().await.unwrap();
        assert!(bridge.tracked().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_snapshot_supersedes_in_flight_pass() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1).with_latency(Duration::from_millis(50)));
        let mut lifecycle = OrderLifecycle::new();
        let mut handle = spawn(StatusSyncBridge::new(surface.clone()), lifecycle.subscribe());

        let id = place(&mut lifecycle);
        // virtual clock: this wakes at 10ms, while the first pass sits in the 50ms surface call
        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.advance_status(id, OrderStatus::Preparing, Utc::now());

        assert!(handle.wait_for_revision(2).await);
        assert_eq!(handle.reconciled_revision(), 2);

        assert_eq!(surface.count(SurfaceOp::Create).await, 1);
        assert_eq!(surface.live_count().await, 1);

        drop(lifecycle);
        let bridge = handle.join().await.unwrap();
        let session = bridge.tracked().unwrap().id.clone();
        assert_eq!(surface.payload_of(&session).await.unwrap().status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_final_snapshot_reconciled_on_shutdown() {
        let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
        let mut lifecycle = OrderLifecycle::new();
        let handle = spawn(StatusSyncBridge::new(surface.clone()), lifecycle.subscribe());

        let id = place(&mut lifecycle);
        lifecycle.advance_status(id, OrderStatus::Preparing, Utc::now());
        drop(lifecycle);

        let bridge = handle.join().await.unwrap();
        let tracked = bridge.tracked().unwrap();
        assert_eq!(tracked.last_payload.as_ref().unwrap().status, OrderStatus::Preparing);
        assert_eq!(surface.count(SurfaceOp::Create).await, 1);
    }
}

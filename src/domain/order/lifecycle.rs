use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::cart::CartState;
use crate::domain::checkout::PaymentMethod;
use crate::event_sourcing::{Aggregate, DomainEvent, EventEnvelope};
use crate::metrics::Metrics;
use super::aggregate::Order;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::{OrderCreated, OrderEvent};
use super::value_objects::{Fulfillment, OrderStatus};

// ============================================================================
// Order Lifecycle
// ============================================================================
//
// Orchestrates: Command -> Order aggregate -> Events -> order collection,
// then publishes a fresh snapshot for observers (the status sync worker).
//
// The collection is only ever written by `create_order`, `advance_status`
// and `cancel_order`. No timers live here; an external driver calls
// `advance_status`.
//
// ============================================================================

/// Committed view of every order, most recent first
#[derive(Debug, Clone, Default)]
pub struct OrderBookSnapshot {
    pub revision: u64,
    pub orders: Vec<Order>,
}

impl OrderBookSnapshot {
    pub fn active_order(&self) -> Option<&Order> {
        active_order(&self.orders)
    }
}

/// First non-terminal order in most-recent-first order
pub fn active_order(orders: &[Order]) -> Option<&Order> {
    orders.iter().find(|o| !o.is_terminal())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Applied,
    UnknownOrder,
    /// The order is already completed or cancelled
    Frozen,
}

/// Data the checkout flow hands over once the submission is accepted
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: Uuid,
    pub accepted_at: DateTime<Utc>,
    pub fulfillment: Fulfillment,
    pub payment_method: PaymentMethod,
}

pub struct OrderLifecycle {
    orders: Vec<Order>,
    journal: Vec<EventEnvelope<OrderEvent>>,
    revision: u64,
    publisher: watch::Sender<Arc<OrderBookSnapshot>>,
    metrics: Option<Arc<Metrics>>,
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderLifecycle {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(Arc::new(OrderBookSnapshot::default()));
        Self {
            orders: Vec::new(),
            journal: Vec::new(),
            revision: 0,
            publisher,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Receives a new snapshot after every committed change
    pub fn subscribe(&self) -> watch::Receiver<Arc<OrderBookSnapshot>> {
        self.publisher.subscribe()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id() == order_id)
    }

    pub fn active_order(&self) -> Option<&Order> {
        active_order(&self.orders)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Every committed order event, oldest first
    pub fn journal(&self) -> &[EventEnvelope<OrderEvent>] {
        &self.journal
    }

    /// Snapshot the cart into a new `accepted` order.
    ///
    /// The caller is expected to clear the cart once this returns `Ok`.
    pub fn create_order(
        &mut self,
        cart: &CartState,
        new_order: NewOrder,
    ) -> Result<EventEnvelope<OrderEvent>, OrderError> {
        if self.order(new_order.order_id).is_some() {
            return Err(OrderError::DuplicateOrder(new_order.order_id));
        }

        let note = cart.note().trim();
        let created = OrderCreated {
            order_id: new_order.order_id,
            items: cart.items().to_vec(),
            amounts: cart.totals().clone(),
            delivery_mode: cart.delivery_mode(),
            fulfillment: new_order.fulfillment,
            payment_method: new_order.payment_method,
            note: (!note.is_empty()).then(|| note.to_string()),
            promo_code: cart.promotion().map(|p| p.code.clone()),
            accepted_at: new_order.accepted_at,
        };

        let order = Order::from_created(&created);
        let envelope = EventEnvelope::new(order.id(), order.version(), OrderEvent::Created(created));

        tracing::info!(
            order_id = %order.id(),
            items = order.item_count(),
            total = %order.amounts().total_amount,
            "Order accepted"
        );

        self.orders.insert(0, order);
        self.journal.push(envelope.clone());
        if let Some(metrics) = &self.metrics {
            metrics.orders_created.inc();
            metrics.order_transitions.with_label_values(&[OrderStatus::Accepted.as_str()]).inc();
        }
        self.publish();

        Ok(envelope)
    }

    /// Move an order to `status`, stamping `status_history[status] = at`.
    ///
    /// Unknown ids and terminal orders are ignored.
    pub fn advance_status(&mut self, order_id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> AdvanceOutcome {
        self.run(order_id, OrderCommand::AdvanceStatus { status, at })
    }

    pub fn cancel_order(&mut self, order_id: Uuid, reason: Option<String>, at: DateTime<Utc>) -> AdvanceOutcome {
        self.run(order_id, OrderCommand::Cancel { reason, at })
    }

    fn run(&mut self, order_id: Uuid, command: OrderCommand) -> AdvanceOutcome {
        let Some(index) = self.orders.iter().position(|o| o.id() == order_id) else {
            tracing::debug!(order_id = %order_id, command = ?command, "Ignoring command for unknown order");
            return AdvanceOutcome::UnknownOrder;
        };

        let (next, events) = match self.orders[index].execute(&command) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Ignoring command for closed order");
                return AdvanceOutcome::Frozen;
            }
        };

        let status = next.status();
        for event in events {
            tracing::info!(
                order_id = %order_id,
                event_type = event.event_type(),
                status = %status,
                "Order status changed"
            );
            self.journal.push(EventEnvelope::new(order_id, next.version(), event));
        }
        self.orders[index] = next;

        if let Some(metrics) = &self.metrics {
            metrics.order_transitions.with_label_values(&[status.as_str()]).inc();
        }
        self.publish();

        AdvanceOutcome::Applied
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.publisher.send_replace(Arc::new(OrderBookSnapshot {
            revision: self.revision,
            orders: self.orders.clone(),
        }));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::cart::{CartTotals, DeliveryMode, LineItem};
use crate::domain::checkout::PaymentMethod;
use crate::event_sourcing::Aggregate;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{Fulfillment, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// Items, amounts, fulfillment and payment are frozen at creation. Only the
// status (and its history) moves, and not at all once terminal.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    version: i64,

    items: Vec<LineItem>,
    amounts: CartTotals,
    delivery_mode: DeliveryMode,
    fulfillment: Fulfillment,
    payment_method: PaymentMethod,
    note: Option<String>,
    promo_code: Option<String>,

    status: OrderStatus,
    status_history: BTreeMap<OrderStatus, DateTime<Utc>>,
    cancelled_reason: Option<String>,
}

impl Order {
    /// Build the aggregate from its creation event
    pub fn from_created(event: &OrderCreated) -> Self {
        let mut status_history = BTreeMap::new();
        status_history.insert(OrderStatus::Accepted, event.accepted_at);

        Self {
            id: event.order_id,
            version: 1,
            items: event.items.clone(),
            amounts: event.amounts.clone(),
            delivery_mode: event.delivery_mode,
            fulfillment: event.fulfillment.clone(),
            payment_method: event.payment_method.clone(),
            note: event.note.clone(),
            promo_code: event.promo_code.clone(),
            status: OrderStatus::Accepted,
            status_history,
            cancelled_reason: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    pub fn amounts(&self) -> &CartTotals {
        &self.amounts
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    pub fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    pub fn payment_method(&self) -> &PaymentMethod {
        &self.payment_method
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn promo_code(&self) -> Option<&str> {
        self.promo_code.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn status_history(&self) -> &BTreeMap<OrderStatus, DateTime<Utc>> {
        &self.status_history
    }

    /// When the current status was (last) entered
    pub fn status_since(&self) -> Option<DateTime<Utc>> {
        self.status_history.get(&self.status).copied()
    }

    pub fn cancelled_reason(&self) -> Option<&str> {
        self.cancelled_reason.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_open(&self) -> Result<(), OrderError> {
        if self.is_terminal() {
            return Err(OrderError::Frozen(self.status));
        }
        Ok(())
    }
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.ensure_open()?;

        match command {
            OrderCommand::AdvanceStatus { status: OrderStatus::Cancelled, at } => {
                Ok(vec![OrderEvent::Cancelled(OrderCancelled { reason: None, at: *at })])
            }
            OrderCommand::AdvanceStatus { status, at } => {
                Ok(vec![OrderEvent::StatusAdvanced(OrderStatusAdvanced {
                    status: *status,
                    at: *at,
                })])
            }
            OrderCommand::Cancel { reason, at } => {
                Ok(vec![OrderEvent::Cancelled(OrderCancelled {
                    reason: reason.clone(),
                    at: *at,
                })])
            }
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Created(_) => return Err(OrderError::NotInitialized),
            OrderEvent::StatusAdvanced(e) => {
                self.status = e.status;
                // Replaying a status overwrites its timestamp
                self.status_history.insert(e.status, e.at);
            }
            OrderEvent::Cancelled(e) => {
                self.status = OrderStatus::Cancelled;
                self.status_history.insert(OrderStatus::Cancelled, e.at);
                self.cancelled_reason = e.reason.clone();
            }
        }
        self.version += 1;
        Ok(())
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

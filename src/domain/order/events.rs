use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::cart::{CartTotals, DeliveryMode, LineItem};
use crate::domain::checkout::PaymentMethod;
use crate::event_sourcing::DomainEvent;
use super::value_objects::{Fulfillment, OrderStatus};

// ============================================================================
// Order Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    StatusAdvanced(OrderStatusAdvanced),
    Cancelled(OrderCancelled),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::StatusAdvanced(_) => "OrderStatusAdvanced",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

/// Order Created - immutable snapshot of the committed checkout
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub items: Vec<LineItem>,
    pub amounts: CartTotals,
    pub delivery_mode: DeliveryMode,
    pub fulfillment: Fulfillment,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    pub promo_code: Option<String>,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStatusAdvanced {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCancelled {
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};

use crate::event_sourcing::DomainEvent;
use super::value_objects::{DeliveryMode, LineItem, LineKey, Promotion};

// ============================================================================
// Cart Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    ItemAdded(LineItem),
    QuantityChanged { line_key: LineKey, quantity: u32 },
    ItemRemoved { line_key: LineKey },
    PromotionApplied(Promotion),
    PromotionCleared,
    DeliveryModeChanged(DeliveryMode),
    NoteChanged(String),
    Cleared,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "CartItemAdded",
            CartEvent::QuantityChanged { .. } => "CartQuantityChanged",
            CartEvent::ItemRemoved { .. } => "CartItemRemoved",
            CartEvent::PromotionApplied(_) => "CartPromotionApplied",
            CartEvent::PromotionCleared => "CartPromotionCleared",
            CartEvent::DeliveryModeChanged(_) => "CartDeliveryModeChanged",
            CartEvent::NoteChanged(_) => "CartNoteChanged",
            CartEvent::Cleared => "CartCleared",
        }
    }
}

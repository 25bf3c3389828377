use serde::{Deserialize, Serialize};

use crate::event_sourcing::Aggregate;
use super::commands::CartCommand;
use super::errors::CartError;
use super::events::CartEvent;
use super::value_objects::{
    CartTotals, DeliveryMode, LineItem, LineKey, PricingConfig, Promotion,
};

// ============================================================================
// Cart Aggregate
// ============================================================================
//
// Derived totals are recomputed after every applied event, so they are always
// a pure function of (items, promotion, delivery_mode) and the fee schedule.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    items: Vec<LineItem>,
    promotion: Option<Promotion>,
    delivery_mode: DeliveryMode,
    note: String,
    pricing: PricingConfig,
    totals: CartTotals,
    version: i64,
}

impl Default for CartState {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl CartState {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            items: Vec::new(),
            promotion: None,
            delivery_mode: DeliveryMode::default(),
            note: String::new(),
            pricing,
            totals: CartTotals::default(),
            version: 0,
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn line(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|l| &l.line_key == key)
    }

    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    fn recompute(&mut self) {
        self.totals = CartTotals::compute(
            &self.items,
            self.promotion.as_ref(),
            self.delivery_mode,
            &self.pricing,
        );
    }

    fn require_line(&self, key: &LineKey) -> Result<&LineItem, CartError> {
        self.line(key).ok_or_else(|| CartError::LineNotFound(key.clone()))
    }
}

/// Interprets a raw UI quantity. `None` means "ignore the call".
fn sanitize_quantity(raw: f64) -> Option<u32> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    // float -> int casts saturate
    Some((raw.floor() as u32).max(1))
}

impl Aggregate for CartState {
    type Event = CartEvent;
    type Command = CartCommand;
    type Error = CartError;

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem { product, modifiers } => {
                let key = LineItem::key_for(product, modifiers);
                match self.line(&key) {
                    Some(existing) => Ok(vec![CartEvent::QuantityChanged {
                        line_key: key,
                        quantity: existing.quantity.saturating_add(1),
                    }]),
                    None => Ok(vec![CartEvent::ItemAdded(LineItem::new(
                        product,
                        modifiers.clone(),
                    ))]),
                }
            }

            CartCommand::RemoveItem { line_key } => {
                self.require_line(line_key)?;
                Ok(vec![CartEvent::ItemRemoved { line_key: line_key.clone() }])
            }

            CartCommand::SetQuantity { line_key, quantity } => {
                let line = self.require_line(line_key)?;
                match sanitize_quantity(*quantity) {
                    Some(q) if q != line.quantity => Ok(vec![CartEvent::QuantityChanged {
                        line_key: line_key.clone(),
                        quantity: q,
                    }]),
                    _ => Ok(vec![]),
                }
            }

            CartCommand::ApplyPromotion(promotion) => {
                Ok(vec![CartEvent::PromotionApplied(promotion.clone())])
            }

            CartCommand::ClearPromotion => {
                if self.promotion.is_none() {
                    return Ok(vec![]);
                }
                Ok(vec![CartEvent::PromotionCleared])
            }

            CartCommand::SetDeliveryMode(mode) => {
                if *mode == self.delivery_mode {
                    return Ok(vec![]);
                }
                Ok(vec![CartEvent::DeliveryModeChanged(*mode)])
            }

            CartCommand::SetNote(note) => Ok(vec![CartEvent::NoteChanged(note.clone())]),

            CartCommand::Clear => Ok(vec![CartEvent::Cleared]),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            CartEvent::ItemAdded(line) => {
                self.items.push(line.clone());
            }
            CartEvent::QuantityChanged { line_key, quantity } => {
                let line = self
                    .items
                    .iter_mut()
                    .find(|l| &l.line_key == line_key)
                    .ok_or_else(|| CartError::LineNotFound(line_key.clone()))?;
                line.quantity = (*quantity).max(1);
            }
            CartEvent::ItemRemoved { line_key } => {
                self.items.retain(|l| &l.line_key != line_key);
            }
            CartEvent::PromotionApplied(promotion) => {
                self.promotion = Some(promotion.clone());
            }
            CartEvent::PromotionCleared => {
                self.promotion = None;
            }
            CartEvent::DeliveryModeChanged(mode) => {
                self.delivery_mode = *mode;
            }
            CartEvent::NoteChanged(note) => {
                self.note = note.clone();
            }
            CartEvent::Cleared => {
                self.items.clear();
                self.promotion = None;
                self.note.clear();
            }
        }

        self.recompute();
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

use super::value_objects::{DeliveryMode, LineKey, Modifier, Product, Promotion};

// ============================================================================
// Cart Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum CartCommand {
    AddItem {
        product: Product,
        modifiers: Vec<Modifier>,
    },
    RemoveItem {
        line_key: LineKey,
    },
    /// `quantity` is the raw value from the UI; non-finite or non-positive
    /// values are ignored.
    SetQuantity {
        line_key: LineKey,
        quantity: f64,
    },
    ApplyPromotion(Promotion),
    ClearPromotion,
    SetDeliveryMode(DeliveryMode),
    SetNote(String),
    Clear,
}

impl CartCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CartCommand::AddItem { .. } => "add_item",
            CartCommand::RemoveItem { .. } => "remove_item",
            CartCommand::SetQuantity { .. } => "set_quantity",
            CartCommand::ApplyPromotion(_) => "apply_promotion",
            CartCommand::ClearPromotion => "clear_promotion",
            CartCommand::SetDeliveryMode(_) => "set_delivery_mode",
            CartCommand::SetNote(_) => "set_note",
            CartCommand::Clear => "clear",
        }
    }
}

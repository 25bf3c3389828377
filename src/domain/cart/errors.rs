use super::value_objects::LineKey;

// ============================================================================
// Cart Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Catalog product has no identity field (name: {0:?})")]
    MissingProductIdentity(String),

    #[error("Catalog modifier has no identity field")]
    MissingModifierIdentity,

    #[error("No cart line with key {0}")]
    LineNotFound(LineKey),

    #[error("Cart is locked while an order submission is in progress")]
    Locked,
}

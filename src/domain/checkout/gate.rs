use crate::domain::cart::{CartState, DeliveryMode};
use super::account::AccountContext;

// ============================================================================
// Checkout Gate
// ============================================================================
//
// Checks run in a fixed order and stop at the first failure, so at most one
// blocking reason is ever surfaced. Evaluation never mutates anything.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockReason {
    #[error("Sign in to place an order")]
    AuthRequired,

    #[error("Add a delivery address to place an order")]
    AddressRequired,

    #[error("Choose a payment method to place an order")]
    PaymentMethodRequired,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::AuthRequired => "auth_required",
            BlockReason::AddressRequired => "address_required",
            BlockReason::PaymentMethodRequired => "payment_method_required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutDecision {
    /// Move on to payment collection
    Proceed,
    /// Empty cart; nothing to show the user
    NothingToCheckout,
    Blocked(BlockReason),
}

impl CheckoutDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, CheckoutDecision::Proceed)
    }
}

pub struct CheckoutGate;

impl CheckoutGate {
    pub fn evaluate(cart: &CartState, account: &AccountContext) -> CheckoutDecision {
        if cart.is_empty() {
            return CheckoutDecision::NothingToCheckout;
        }
        if !account.is_authenticated {
            return CheckoutDecision::Blocked(BlockReason::AuthRequired);
        }
        if cart.delivery_mode() == DeliveryMode::Delivery && account.addresses.is_empty() {
            return CheckoutDecision::Blocked(BlockReason::AddressRequired);
        }
        if account.payment_methods.is_empty() {
            return CheckoutDecision::Blocked(BlockReason::PaymentMethodRequired);
        }
        CheckoutDecision::Proceed
    }
}

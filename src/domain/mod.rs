// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each domain has its own subdirectory. This layer knows nothing about the
// live-status surface or how orders reach the backend.
//
// ============================================================================

pub mod cart;
pub mod checkout;
pub mod order;

// ============================================================================
// Checkout Domain
// ============================================================================
//
// - Account context (read-only collaborator input)
// - Checkout gate (precondition validation)
// - Order submission contract
//
// ============================================================================

pub mod account;
pub mod gate;
pub mod submission;

pub use account::*;
pub use gate::*;
pub use submission::*;

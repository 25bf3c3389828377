// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic reducer infrastructure shared by the cart and order aggregates.
// Domain-specific code is in src/domain/
//
// ============================================================================

mod core;

pub use self::core::*;

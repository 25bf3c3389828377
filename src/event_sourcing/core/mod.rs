// ============================================================================
// Event Sourcing Core - Generic Reducer Abstractions
// ============================================================================
//
// No domain-specific code lives here (no Cart, Order, ...).
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::Aggregate;
pub use event::{DomainEvent, EventEnvelope};

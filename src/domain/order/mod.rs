// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (OrderStatus, Fulfillment)
// - Events / Commands / Errors
// - Aggregate (Order)
// - Lifecycle (the order collection and its change feed)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod lifecycle;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use lifecycle::*;

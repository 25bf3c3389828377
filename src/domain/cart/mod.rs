// ============================================================================
// Cart Domain
// ============================================================================
//
// Line-item aggregation and pricing:
// - Value objects (LineItem, Modifier, Promotion, CartTotals)
// - Commands / Events / Errors
// - Aggregate (CartState)
// - Catalog ingestion (CatalogRecord -> Product)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod catalog;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use catalog::*;

use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order is {0} and can no longer change")]
    Frozen(OrderStatus),

    #[error("Order {0} already exists")]
    DuplicateOrder(Uuid),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

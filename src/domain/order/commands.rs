use chrono::{DateTime, Utc};

use super::value_objects::OrderStatus;

// ============================================================================
// Order Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    AdvanceStatus {
        status: OrderStatus,
        at: DateTime<Utc>,
    },
    Cancel {
        reason: Option<String>,
        at: DateTime<Utc>,
    },
}

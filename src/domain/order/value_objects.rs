use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::checkout::Address;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Declared in lifecycle order so `Ord` follows the happy path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Accepted,
    Preparing,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the order goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fulfillment {
    Delivery { address: Address },
    Pickup,
}

impl Fulfillment {
    pub fn is_pickup(&self) -> bool {
        matches!(self, Fulfillment::Pickup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
        assert!(!OrderStatus::Delivering.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_order_follows_happy_path() {
        assert!(OrderStatus::Accepted < OrderStatus::Preparing);
        assert!(OrderStatus::Preparing < OrderStatus::Delivering);
        assert!(OrderStatus::Delivering < OrderStatus::Completed);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&OrderStatus::Delivering).unwrap();
        assert_eq!(json, "\"delivering\"");
        let status: OrderStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, OrderStatus::Completed);
    }

    #[test]
    fn test_pickup_fulfillment_tag() {
        let json = serde_json::to_value(&Fulfillment::Pickup).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "pickup"}));
    }
}

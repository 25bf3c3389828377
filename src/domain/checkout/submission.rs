use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::cart::{CartState, DeliveryMode, ProductId};
use crate::domain::order::OrderStatus;
use crate::utils::IsTransient;

// ============================================================================
// Order Submission - contract with the order-submission collaborator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destination {
    Address {
        #[serde(rename = "addressId")]
        address_id: Uuid,
    },
    Pickup {
        pickup: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Request body sent when the customer commits the checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    #[serde(flatten)]
    pub destination: Destination,
    pub line_items: Vec<SubmissionLine>,
    pub note: Option<String>,
    pub promo_code: Option<String>,
    pub delivery_mode: DeliveryMode,
    pub payment_method_id: Uuid,
}

impl OrderSubmission {
    pub fn from_cart(cart: &CartState, destination: Destination, payment_method_id: Uuid) -> Self {
        let note = cart.note().trim();
        Self {
            destination,
            line_items: cart
                .items()
                .iter()
                .map(|line| SubmissionLine {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                })
                .collect(),
            note: (!note.is_empty()).then(|| note.to_string()),
            promo_code: cart.promotion().map(|p| p.code.clone()),
            delivery_mode: cart.delivery_mode(),
            payment_method_id,
        }
    }
}

/// What the collaborator returns for an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    #[error("Network error while submitting order: {0}")]
    Network(String),

    #[error("Server error while submitting order: {0}")]
    Server(String),

    #[error("Order rejected: {0}")]
    Validation(String),
}

impl IsTransient for SubmissionError {
    fn is_transient(&self) -> bool {
        matches!(self, SubmissionError::Network(_) | SubmissionError::Server(_))
    }
}

#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, submission: &OrderSubmission) -> Result<SubmissionReceipt, SubmissionError>;
}

// ============================================================================
// In-memory submitter
// ============================================================================

/// Accepts every submission unless a failure was scripted with `fail_next`
#[derive(Default)]
pub struct InMemoryOrderSubmitter {
    scripted_failures: Mutex<VecDeque<SubmissionError>>,
    accepted: Mutex<Vec<OrderSubmission>>,
    attempts: Mutex<u32>,
}

impl InMemoryOrderSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next(&self, error: SubmissionError) {
        self.scripted_failures.lock().await.push_back(error);
    }

    pub async fn accepted(&self) -> Vec<OrderSubmission> {
        self.accepted.lock().await.clone()
    }

    pub async fn attempts(&self) -> u32 {
        *self.attempts.lock().await
    }
}

#[async_trait]
impl OrderSubmitter for InMemoryOrderSubmitter {
    async fn submit(&self, submission: &OrderSubmission) -> Result<SubmissionReceipt, SubmissionError> {
        *self.attempts.lock().await += 1;

        if let Some(error) = self.scripted_failures.lock().await.pop_front() {
            tracing::debug!(error = %error, "Scripted submission failure");
            return Err(error);
        }

        self.accepted.lock().await.push(submission.clone());

        Ok(SubmissionReceipt {
            id: Uuid::now_v7(),
            status: OrderStatus::Accepted,
            created_at: Utc::now(),
        })
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Account Context - read-only input from the account collaborator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethodType {
    Card,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub method_type: PaymentMethodType,
    pub last_four: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountContext {
    pub is_authenticated: bool,
    pub addresses: Vec<Address>,
    pub payment_methods: Vec<PaymentMethod>,
    /// Explicit delivery target; falls back to the first saved address
    pub selected_address_id: Option<Uuid>,
}

impl AccountContext {
    pub fn delivery_address(&self) -> Option<&Address> {
        self.selected_address_id
            .and_then(|id| self.addresses.iter().find(|a| a.id == id))
            .or_else(|| self.addresses.first())
    }

    pub fn payment_method(&self, id: Uuid) -> Option<&PaymentMethod> {
        self.payment_methods.iter().find(|p| p.id == id)
    }
}

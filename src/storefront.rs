use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::CommerceConfig;
use crate::domain::cart::{
    CartCommand, CartError, CartEvent, CartState, CatalogRecord, DeliveryMode, LineItem, LineKey, Modifier,
};
use crate::domain::checkout::{
    AccountContext, BlockReason, CheckoutDecision, CheckoutGate, Destination, OrderSubmission, OrderSubmitter,
    PaymentMethod, SubmissionError, SubmissionReceipt,
};
use crate::domain::order::{
    AdvanceOutcome, Fulfillment, NewOrder, Order, OrderBookSnapshot, OrderError, OrderLifecycle, OrderStatus,
};
use crate::event_sourcing::Aggregate;
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

// ============================================================================
// Storefront - ties the cart, checkout flow and order lifecycle together
// ============================================================================
//
// Checkout stages:
//
//   Browsing --evaluate(Proceed)--> CollectingPayment --begin--> Processing
//      ^                                   ^                        |
//      |                                   +------ failure ---------+
//      +--------------------- success (order created) --------------+
//
// While Processing, a second submission and any cart edit are rejected. A
// failed submission never touches the cart; a successful one clears it
// exactly once.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Checkout is not available: {0:?}")]
    NotReady(CheckoutDecision),

    #[error("An order submission is already in progress")]
    AlreadyProcessing,

    #[error("No order submission in progress")]
    NotProcessing,

    #[error("Unknown payment method {0}")]
    UnknownPaymentMethod(Uuid),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Everything captured when the customer commits, kept until the backend answers
#[derive(Debug, Clone)]
pub struct PendingCheckout {
    pub submission: OrderSubmission,
    cart: CartState,
    fulfillment: Fulfillment,
    payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default)]
pub enum CheckoutStage {
    #[default]
    Browsing,
    CollectingPayment,
    Processing(PendingCheckout),
}

impl CheckoutStage {
    pub fn is_processing(&self) -> bool {
        matches!(self, CheckoutStage::Processing(_))
    }
}

pub struct Storefront {
    cart: CartState,
    lifecycle: OrderLifecycle,
    stage: CheckoutStage,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl Storefront {
    pub fn new(config: &CommerceConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            cart: CartState::new(config.pricing.clone()),
            lifecycle: OrderLifecycle::new().with_metrics(metrics.clone()),
            stage: CheckoutStage::Browsing,
            retry: config.retry_config(),
            metrics,
        }
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn stage(&self) -> &CheckoutStage {
        &self.stage
    }

    pub fn orders(&self) -> &[Order] {
        self.lifecycle.orders()
    }

    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<OrderBookSnapshot>> {
        self.lifecycle.subscribe()
    }

    // ------------------------------------------------------------------------
    // Cart
    // ------------------------------------------------------------------------

    /// Run one cart transition; the cart is replaced only on success.
    ///
    /// The cart is locked while a submission is in flight.
    pub fn dispatch(&mut self, command: CartCommand) -> Result<Vec<CartEvent>, CartError> {
        if self.stage.is_processing() {
            self.metrics.record_cart_command(command.name(), "rejected");
            tracing::warn!(command = command.name(), "Cart is locked during order submission");
            return Err(CartError::Locked);
        }

        match self.cart.execute(&command) {
            Ok((next, events)) => {
                let outcome = if events.is_empty() { "noop" } else { "applied" };
                self.metrics.record_cart_command(command.name(), outcome);
                tracing::debug!(
                    command = command.name(),
                    events = events.len(),
                    subtotal = %next.totals().subtotal,
                    total = %next.totals().total_amount,
                    "Cart updated"
                );
                self.cart = next;
                Ok(events)
            }
            Err(e) => {
                self.metrics.record_cart_command(command.name(), "rejected");
                tracing::warn!(command = command.name(), error = %e, "Cart command rejected");
                Err(e)
            }
        }
    }

    /// Add a raw catalog record (with its chosen modifiers) to the cart
    pub fn add_catalog_record(&mut self, record: &CatalogRecord) -> Result<LineKey, CartError> {
        let product = record.to_product().inspect_err(|e| {
            tracing::warn!(name = %record.name, error = %e, "Skipping catalog record without identity");
        })?;
        let modifiers = record
            .modifiers
            .iter()
            .map(|m| m.to_modifier())
            .collect::<Result<Vec<Modifier>, _>>()
            .inspect_err(|e| {
                tracing::warn!(name = %record.name, error = %e, "Skipping catalog record with unidentified modifier");
            })?;

        let key = LineItem::key_for(&product, &modifiers);
        self.dispatch(CartCommand::AddItem { product, modifiers })?;
        Ok(key)
    }

    // ------------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------------

    /// Run the gate; `Proceed` moves the flow on to payment collection
    pub fn evaluate_checkout(&mut self, account: &AccountContext) -> CheckoutDecision {
        let decision = CheckoutGate::evaluate(&self.cart, account);
        self.metrics
            .checkout_decisions
            .with_label_values(&[decision_label(&decision)])
            .inc();

        if !self.stage.is_processing() {
            self.stage = if decision.is_proceed() {
                CheckoutStage::CollectingPayment
            } else {
                CheckoutStage::Browsing
            };
        }

        match decision {
            CheckoutDecision::Blocked(reason) => {
                tracing::info!(reason = reason.as_str(), "Checkout blocked");
            }
            _ => tracing::debug!(decision = ?decision, "Checkout evaluated"),
        }
        decision
    }

    /// Freeze the cart into a submission payload and enter `Processing`
    pub fn begin_submission(
        &mut self,
        account: &AccountContext,
        payment_method_id: Uuid,
    ) -> Result<OrderSubmission, CheckoutError> {
        if self.stage.is_processing() {
            tracing::warn!("Rejecting re-entrant order submission");
            return Err(CheckoutError::AlreadyProcessing);
        }

        let decision = self.evaluate_checkout(account);
        if !decision.is_proceed() {
            return Err(CheckoutError::NotReady(decision));
        }

        let payment_method = account
            .payment_method(payment_method_id)
            .cloned()
            .ok_or(CheckoutError::UnknownPaymentMethod(payment_method_id))?;

        let (destination, fulfillment) = match self.cart.delivery_mode() {
            DeliveryMode::Pickup => (Destination::Pickup { pickup: true }, Fulfillment::Pickup),
            DeliveryMode::Delivery => {
                let address = account.delivery_address().cloned().ok_or(CheckoutError::NotReady(
                    CheckoutDecision::Blocked(BlockReason::AddressRequired),
                ))?;
                (Destination::Address { address_id: address.id }, Fulfillment::Delivery { address })
            }
        };

        let submission = OrderSubmission::from_cart(&self.cart, destination, payment_method.id);
        self.stage = CheckoutStage::Processing(PendingCheckout {
            submission: submission.clone(),
            cart: self.cart.clone(),
            fulfillment,
            payment_method,
        });

        tracing::info!(
            lines = submission.line_items.len(),
            total = %self.cart.totals().total_amount,
            "Submitting order"
        );
        Ok(submission)
    }

    /// Settle the in-flight submission.
    ///
    /// Success creates the order from the cart as it was when submitted and
    /// clears the cart. Failure returns to payment collection with the cart
    /// untouched.
    pub fn complete_submission(
        &mut self,
        result: Result<SubmissionReceipt, SubmissionError>,
    ) -> Result<Uuid, CheckoutError> {
        let pending = match std::mem::take(&mut self.stage) {
            CheckoutStage::Processing(pending) => pending,
            other => {
                self.stage = other;
                return Err(CheckoutError::NotProcessing);
            }
        };
        self.stage = CheckoutStage::CollectingPayment;

        let receipt = result.inspect_err(|e| {
            tracing::warn!(error = %e, "Order submission failed, cart kept");
        })?;

        let envelope = self.lifecycle.create_order(&pending.cart, NewOrder {
            order_id: receipt.id,
            accepted_at: receipt.created_at,
            fulfillment: pending.fulfillment,
            payment_method: pending.payment_method,
        })?;

        self.dispatch(CartCommand::Clear)?;
        self.stage = CheckoutStage::Browsing;
        Ok(envelope.aggregate_id)
    }

    /// begin -> submit (retrying transient failures) -> complete
    pub async fn place_order(
        &mut self,
        account: &AccountContext,
        payment_method_id: Uuid,
        submitter: &dyn OrderSubmitter,
    ) -> Result<Uuid, CheckoutError> {
        let submission = self.begin_submission(account, payment_method_id)?;
        let metrics = &self.metrics;
        let submission = &submission;

        let result = retry_on_transient(&self.retry, |attempt| async move {
            let result = submitter.submit(submission).await;
            let outcome = match &result {
                Ok(_) => "accepted",
                Err(e) if e.is_transient() => "transient_failure",
                Err(_) => "rejected",
            };
            metrics.submission_attempts.with_label_values(&[outcome]).inc();
            tracing::debug!(attempt = attempt, outcome = outcome, "Order submission attempt");
            result
        })
        .await
        .into_result();

        self.complete_submission(result)
    }

    // ------------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------------

    pub fn advance_status(&mut self, order_id: Uuid, status: OrderStatus, at: DateTime<Utc>) -> AdvanceOutcome {
        self.lifecycle.advance_status(order_id, status, at)
    }

    pub fn cancel_order(&mut self, order_id: Uuid, reason: Option<String>, at: DateTime<Utc>) -> AdvanceOutcome {
        self.lifecycle.cancel_order(order_id, reason, at)
    }
}

fn decision_label(decision: &CheckoutDecision) -> &'static str {
    match decision {
        CheckoutDecision::Proceed => "proceed",
        CheckoutDecision::NothingToCheckout => "nothing_to_checkout",
        CheckoutDecision::Blocked(reason) => reason.as_str(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

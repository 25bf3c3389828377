use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the commerce engine
// ============================================================================
//
// Covers:
// - Cart commands and their outcomes
// - Checkout gate decisions and order submissions
// - Order creation and status transitions
// - Live status surface calls, failures and tracked sessions
//
// Each `Metrics` owns its own registry so independent engines (and tests)
// never collide on registration.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Cart
    pub cart_commands: IntCounterVec,

    // Checkout
    pub checkout_decisions: IntCounterVec,
    pub submission_attempts: IntCounterVec,

    // Orders
    pub orders_created: IntCounter,
    pub order_transitions: IntCounterVec,

    // Status sync
    pub status_sync_calls: IntCounterVec,
    pub status_sync_failures: IntCounterVec,
    pub status_sync_tracked_sessions: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cart_commands = IntCounterVec::new(
            Opts::new("cart_commands_total", "Cart commands by outcome"),
            &["command", "outcome"],
        )?;
        registry.register(Box::new(cart_commands.clone()))?;

        let checkout_decisions = IntCounterVec::new(
            Opts::new("checkout_decisions_total", "Checkout gate decisions"),
            &["decision"],
        )?;
        registry.register(Box::new(checkout_decisions.clone()))?;

        let submission_attempts = IntCounterVec::new(
            Opts::new("order_submission_attempts_total", "Order submission attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(submission_attempts.clone()))?;

        let orders_created = IntCounter::new("orders_created_total", "Orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Order status transitions by target status"),
            &["status"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let status_sync_calls = IntCounterVec::new(
            Opts::new("status_sync_calls_total", "Calls made to the live status surface"),
            &["operation"],
        )?;
        registry.register(Box::new(status_sync_calls.clone()))?;

        let status_sync_failures = IntCounterVec::new(
            Opts::new("status_sync_failures_total", "Failed live status surface calls"),
            &["operation"],
        )?;
        registry.register(Box::new(status_sync_failures.clone()))?;

        let status_sync_tracked_sessions = IntGauge::new(
            "status_sync_tracked_sessions",
            "Live status sessions tracked locally (0 or 1)",
        )?;
        registry.register(Box::new(status_sync_tracked_sessions.clone()))?;

        Ok(Self {
            registry,
            cart_commands,
            checkout_decisions,
            submission_attempts,
            orders_created,
            order_transitions,
            status_sync_calls,
            status_sync_failures,
            status_sync_tracked_sessions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_cart_command(&self, command: &str, outcome: &str) {
        self.cart_commands.with_label_values(&[command, outcome]).inc();
    }

    pub fn record_surface_call(&self, operation: &str, success: bool) {
        self.status_sync_calls.with_label_values(&[operation]).inc();
        if !success {
            self.status_sync_failures.with_label_values(&[operation]).inc();
        }
    }

    /// Prometheus text exposition of everything registered
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_two_instances_do_not_collide() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.orders_created.inc();
        assert_eq!(a.orders_created.get(), 1);
        assert_eq!(b.orders_created.get(), 0);
    }

    #[test]
    fn test_record_surface_call() {
        let metrics = Metrics::new().unwrap();
        metrics.record_surface_call("create", true);
        metrics.record_surface_call("create", false);

        assert_eq!(metrics.status_sync_calls.with_label_values(&["create"]).get(), 2);
        assert_eq!(metrics.status_sync_failures.with_label_values(&["create"]).get(), 1);
    }

    #[test]
    fn test_render_contains_registered_names() {
        let metrics = Metrics::new().unwrap();
        metrics.record_cart_command("add_item", "applied");
        let text = metrics.render().unwrap();
        assert!(text.contains("cart_commands_total"));
        assert!(text.contains("orders_created_total"));
    }
}

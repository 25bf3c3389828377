use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use delivery_commerce::config::CommerceConfig;
use delivery_commerce::domain::cart::{CartCommand, CatalogRecord, Promotion};
use delivery_commerce::domain::checkout::{
    AccountContext, Address, InMemoryOrderSubmitter, PaymentMethod, PaymentMethodType, SubmissionError,
};
use delivery_commerce::domain::order::OrderStatus;
use delivery_commerce::metrics::Metrics;
use delivery_commerce::status_sync::{self, InMemoryLiveStatusSurface, StatusSyncBridge};
use delivery_commerce::storefront::Storefront;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,delivery_commerce=debug"))
        )
        .init();

    tracing::info!("Starting delivery commerce demo");

    // === 1. Configuration (optional file path as first argument) ===
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = CommerceConfig::load(config_path.as_deref())?;
    tracing::info!(
        base_delivery_fee = %config.pricing.base_delivery_fee,
        free_delivery_threshold = %config.pricing.free_delivery_threshold,
        status_sync = config.status_sync.enabled,
        "Configuration loaded"
    );

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 3. Storefront + live status sync ===
    let mut store = Storefront::new(&config, metrics.clone());

    let surface = Arc::new(InMemoryLiveStatusSurface::new(1));
    // a session left over from an earlier run; the bridge adopts it
    surface.seed_session("live-previous-run").await;

    let mut sync = config.status_sync.enabled.then(|| {
        let bridge = StatusSyncBridge::new(surface.clone()).with_metrics(metrics.clone());
        status_sync::spawn(bridge, store.subscribe())
    });

    // === 4. Build a cart from catalog records ===
    let burger: CatalogRecord = serde_json::from_value(json!({
        "_id": "burger-01",
        "name": "Classic Burger",
        "price": 200,
        "modifiers": [
            {"id": "cheese", "price": 20, "qty": 1},
            {"id": "bacon", "price": 40, "qty": 1}
        ]
    }))?;
    let lemonade: CatalogRecord = serde_json::from_value(json!({
        "productId": 42,
        "name": "Lemonade",
        "price": "35.50"
    }))?;

    let burger_line = store.add_catalog_record(&burger)?;
    store.add_catalog_record(&lemonade)?;
    store.dispatch(CartCommand::SetQuantity { line_key: burger_line, quantity: 2.0 })?;
    store.dispatch(CartCommand::ApplyPromotion(Promotion::percent("WELCOME10", Decimal::from(10))))?;
    store.dispatch(CartCommand::SetNote("Leave at the door".into()))?;

    let totals = store.cart().totals();
    tracing::info!(
        items = store.cart().item_count(),
        subtotal = %totals.subtotal,
        delivery_fee = %totals.delivery_fee,
        discount = %totals.discount_amount,
        total = %totals.total_amount,
        "Cart ready"
    );

    // === 5. Checkout ===
    let card = PaymentMethod {
        id: Uuid::new_v4(),
        method_type: PaymentMethodType::Card,
        last_four: Some("4242".into()),
    };
    let guest = AccountContext::default();
    let decision = store.evaluate_checkout(&guest);
    tracing::info!(decision = ?decision, "Guest tried to check out");

    let account = AccountContext {
        is_authenticated: true,
        addresses: vec![Address {
            id: Uuid::new_v4(),
            label: Some("Home".into()),
            street: "12 Amir Temur Ave".into(),
            city: "Tashkent".into(),
            postal_code: "100000".into(),
        }],
        payment_methods: vec![card.clone()],
        selected_address_id: None,
    };

    let submitter = InMemoryOrderSubmitter::new();
    submitter.fail_next(SubmissionError::Network("connection reset".into())).await;
    let order_id = store.place_order(&account, card.id, &submitter).await?;
    tracing::info!(order_id = %order_id, attempts = submitter.attempts().await, "Order placed");

    // === 6. Drive the order through its lifecycle ===
    for status in [OrderStatus::Preparing, OrderStatus::Delivering, OrderStatus::Completed] {
        store.advance_status(order_id, status, Utc::now());
        if let Some(handle) = sync.as_mut() {
            handle.wait_for_revision(store.lifecycle().revision()).await;
        }
    }

    // === 7. Shutdown ===
    drop(store);
    if let Some(handle) = sync {
        let bridge = handle.join().await?;
        tracing::info!(tracked = bridge.tracked().is_some(), "Status sync stopped");
    }
    tracing::info!(live_sessions = surface.live_count().await, calls = surface.calls().await.len(), "Surface state");

    println!("{}", metrics.render()?);
    tracing::info!("Demo complete");

    Ok(())
}

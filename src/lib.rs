pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod status_sync;
pub mod storefront;
pub mod utils;

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Apply the configured level unless `RUST_LOG` overrides it
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Initialization is idempotent so tests and embedders can call it freely

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tessera={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

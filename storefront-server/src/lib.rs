//! Storefront Server - cart, promo and loyalty backend for the
//! food-ordering storefront
//!
//! # Module Structure
//!
//! ```text
//! storefront-server/src/
//! ├── core/          # Config, state, server lifecycle
//! ├── storage.rs     # redb persistence
//! ├── services/      # Cart, promo, loyalty, payment, checkout
//! └── api/           # HTTP routes and handlers
//! ```
//!
//! Pricing itself lives in the `shared` crate: handlers mutate
//! [`shared::cart::CartState`] through the services and return the
//! recomputed quote.

pub mod api;
pub mod core;
pub mod services;
pub mod storage;

pub use core::{Config, Server, ServerState};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// Load .env, then initialize tracing from `RUST_LOG` (default `info`)
pub fn setup_environment() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __                  ____                 __
  / ___// /_____  ________  / __/________  ____  / /_
  \__ \/ __/ __ \/ ___/ _ \/ /_/ ___/ __ \/ __ \/ __/
 ___/ / /_/ /_/ / /  /  __/ __/ /  / /_/ / / / / /_
/____/\__/\____/_/   \___/_/ /_/   \____/_/ /_/\__/
    "#
    );
}

//! Server state
//!
//! One [`ServerState`] instance is shared by every handler. Services are
//! cheap to clone (each is an `Arc` or holds one) so axum's state
//! cloning stays shallow.

use std::sync::Arc;

use crate::core::Config;
use crate::services::{
    CartService, CheckoutService, HostedCheckoutGateway, LoyaltyService, PromoService,
};
use crate::storage::StorefrontStorage;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: StorefrontStorage,
    pub carts: CartService,
    pub promos: PromoService,
    pub loyalty: LoyaltyService,
    pub checkout: CheckoutService,
}

impl ServerState {
    /// Open storage and wire up the service graph
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = StorefrontStorage::open(config.database_path())?;
        tracing::info!("Database ready at {}", config.database_path().display());

        let carts = CartService::with_pickup_fee(storage.clone(), config.pay_on_pickup_fee);
        let promos = PromoService::new(storage.clone());
        let loyalty = LoyaltyService::new(storage.clone());
        let gateway = Arc::new(HostedCheckoutGateway::new(
            config.payment_base_url.clone(),
            config.payment_secret.clone(),
        ));
        let checkout = CheckoutService::new(
            storage.clone(),
            carts.clone(),
            promos.clone(),
            loyalty.clone(),
            gateway,
        );

        Ok(Self {
            config: config.clone(),
            storage,
            carts,
            promos,
            loyalty,
            checkout,
        })
    }
}

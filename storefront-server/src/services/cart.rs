//! Per-user cart sessions
//!
//! Carts live in memory (DashMap keyed by user id) and are written through
//! to storage after every mutation. Only the persisted subset (items,
//! location, delivery type) survives a restart; promo, coupon, tip and
//! payment type restart at their defaults.

use dashmap::DashMap;
use serde::Serialize;
use shared::cart::{
    CartState, CheckoutEligibility, CartLineItem, DeliveryType, NewCartItem, PaymentType,
    PersistedCart,
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{LoyaltyCoupon, PromoAcceptance};
use std::sync::Arc;

use crate::storage::StorefrontStorage;

/// The full derived view of a cart, recomputed after every read or mutation
#[derive(Debug, Clone, Serialize)]
pub struct CartQuote {
    pub items: Vec<CartLineItem>,
    pub item_count: i32,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub payment_fee: f64,
    pub discount: f64,
    pub tip: f64,
    pub total: f64,
    pub delivery_type: DeliveryType,
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_coupon_id: Option<String>,
    pub checkout: CheckoutEligibility,
}

impl CartQuote {
    fn from_state(state: &CartState) -> Self {
        Self {
            items: state.items.clone(),
            item_count: state.item_count(),
            subtotal: state.subtotal(),
            delivery_fee: state.delivery_fee(),
            payment_fee: state.payment_fee(),
            discount: state.discount(),
            tip: state.tip,
            total: state.total(),
            delivery_type: state.delivery_type,
            payment_type: state.payment_type,
            location_id: state.location_id.clone(),
            promo_code: state.promo_code.as_ref().map(|p| p.code.clone()),
            loyalty_coupon_id: state.loyalty_coupon.as_ref().map(|c| c.id.clone()),
            checkout: state.can_checkout(),
        }
    }
}

/// Cart session manager
#[derive(Clone)]
pub struct CartService {
    storage: StorefrontStorage,
    sessions: Arc<DashMap<String, CartState>>,
    pay_on_pickup_fee: f64,
}

impl CartService {
    pub fn new(storage: StorefrontStorage) -> Self {
        Self::with_pickup_fee(storage, 0.0)
    }

    pub fn with_pickup_fee(storage: StorefrontStorage, pay_on_pickup_fee: f64) -> Self {
        Self {
            storage,
            sessions: Arc::new(DashMap::new()),
            pay_on_pickup_fee,
        }
    }

    /// Run a mutation against a user's cart and persist the result.
    ///
    /// The cart is rehydrated from storage on first access; a missing or
    /// unreadable saved cart starts a session from defaults.
    pub fn mutate<F, R>(&self, user_id: &str, f: F) -> AppResult<(R, CartQuote)>
    where
        F: FnOnce(&mut CartState) -> R,
    {
        let mut entry = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| self.rehydrate(user_id));
        let result = f(entry.value_mut());
        let quote = CartQuote::from_state(entry.value());
        let persisted = PersistedCart::from_state(entry.value());
        drop(entry);

        self.storage.save_cart(user_id, &persisted)?;
        Ok((result, quote))
    }

    /// Read-only view of a user's cart
    pub fn quote(&self, user_id: &str) -> CartQuote {
        let entry = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| self.rehydrate(user_id));
        CartQuote::from_state(entry.value())
    }

    /// Snapshot of the raw cart state (for checkout)
    pub fn snapshot(&self, user_id: &str) -> CartState {
        let entry = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| self.rehydrate(user_id));
        entry.value().clone()
    }

    fn rehydrate(&self, user_id: &str) -> CartState {
        let persisted = match self.storage.load_cart(user_id) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return self.fresh_session(),
            Err(e) => {
                tracing::warn!("Failed to load saved cart for {}: {}", user_id, e);
                return self.fresh_session();
            }
        };

        let mut state = persisted.restore();
        state.pay_on_pickup_fee = self.pay_on_pickup_fee;
        // Re-resolve location-derived config; a vanished location falls
        // back to the defaults baked into CartState
        if let Some(location_id) = state.location_id.clone() {
            match self.storage.get_location(&location_id) {
                Ok(Some(location)) if location.is_active => {
                    state.set_location_config(location.min_order_value, location.delivery_fee);
                }
                Ok(_) => {
                    tracing::warn!(
                        "Saved cart for {} references unknown location {}",
                        user_id,
                        location_id
                    );
                    state.location_id = None;
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve location {}: {}", location_id, e);
                }
            }
        }
        state
    }

    fn fresh_session(&self) -> CartState {
        CartState {
            pay_on_pickup_fee: self.pay_on_pickup_fee,
            ..CartState::default()
        }
    }

    // ==================== Mutations ====================

    /// Add an item; returns the affected line id alongside the new quote
    pub fn add_item(&self, user_id: &str, item: NewCartItem) -> AppResult<(String, CartQuote)> {
        let now = shared::util::now_millis();
        self.mutate(user_id, |cart| cart.add_item(item, now))
    }

    /// Set a line's quantity. Unknown line ids are rejected; a quantity of
    /// zero or less removes the line.
    pub fn update_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i32,
    ) -> AppResult<CartQuote> {
        let (found, quote) = self.mutate(user_id, |cart| {
            let found = cart.items.iter().any(|l| l.id == line_id);
            cart.update_quantity(line_id, quantity);
            found
        })?;
        if !found {
            return Err(AppError::new(ErrorCode::CartItemNotFound)
                .with_detail("line_id", line_id.to_string()));
        }
        Ok(quote)
    }

    pub fn remove_item(&self, user_id: &str, line_id: &str) -> AppResult<CartQuote> {
        let (found, quote) = self.mutate(user_id, |cart| {
            let found = cart.items.iter().any(|l| l.id == line_id);
            cart.remove_item(line_id);
            found
        })?;
        if !found {
            return Err(AppError::new(ErrorCode::CartItemNotFound)
                .with_detail("line_id", line_id.to_string()));
        }
        Ok(quote)
    }

    pub fn clear(&self, user_id: &str) -> AppResult<CartQuote> {
        Ok(self.mutate(user_id, |cart| cart.clear_cart())?.1)
    }

    pub fn set_tip(&self, user_id: &str, amount: f64) -> AppResult<CartQuote> {
        Ok(self.mutate(user_id, |cart| cart.set_tip(amount))?.1)
    }

    pub fn set_delivery_type(
        &self,
        user_id: &str,
        delivery_type: DeliveryType,
    ) -> AppResult<CartQuote> {
        Ok(self
            .mutate(user_id, |cart| cart.set_delivery_type(delivery_type))?
            .1)
    }

    pub fn set_payment_type(
        &self,
        user_id: &str,
        payment_type: PaymentType,
    ) -> AppResult<CartQuote> {
        Ok(self
            .mutate(user_id, |cart| cart.set_payment_type(payment_type))?
            .1)
    }

    /// Bind the cart to a store location and adopt its minimum order value
    /// and delivery fee
    pub fn set_location(&self, user_id: &str, location_id: &str) -> AppResult<CartQuote> {
        let location = self
            .storage
            .get_location(location_id)?
            .filter(|l| l.is_active)
            .ok_or_else(|| AppError::not_found(format!("Location {location_id}")))?;

        Ok(self
            .mutate(user_id, |cart| {
                cart.location_id = Some(location.id.clone());
                cart.set_location_config(location.min_order_value, location.delivery_fee);
            })?
            .1)
    }

    /// Install a validated promo. Any active loyalty coupon is displaced.
    pub fn apply_promo(&self, user_id: &str, accepted: &PromoAcceptance) -> AppResult<CartQuote> {
        Ok(self
            .mutate(user_id, |cart| {
                cart.set_promo_code(&accepted.code, accepted.discount_value, accepted.discount_type)
            })?
            .1)
    }

    pub fn clear_promo(&self, user_id: &str) -> AppResult<CartQuote> {
        Ok(self.mutate(user_id, |cart| cart.clear_promo_code())?.1)
    }

    /// Install a loyalty coupon. Any active promo is displaced.
    pub fn apply_coupon(&self, user_id: &str, coupon: LoyaltyCoupon) -> AppResult<CartQuote> {
        Ok(self
            .mutate(user_id, |cart| cart.set_loyalty_coupon(coupon))?
            .1)
    }

    pub fn clear_coupon(&self, user_id: &str) -> AppResult<CartQuote> {
        Ok(self.mutate(user_id, |cart| cart.clear_loyalty_coupon())?.1)
    }

    /// Empty the cart after a completed order; the location binding and
    /// delivery type carry over to the next order
    pub fn reset_after_order(&self, user_id: &str) -> AppResult<CartQuote> {
        Ok(self.mutate(user_id, |cart| cart.clear_cart())?.1)
    }
}

// ==================== Tests ====================

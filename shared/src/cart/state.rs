//! Cart state container
//!
//! The aggregate root for one shopping session. Mutators keep the cart's
//! invariants by construction:
//! - promo code and loyalty coupon are never simultaneously set
//! - tip stays within [`TIP_MIN`], [`TIP_MAX`] after every mutation
//! - quantity never drops to zero or below; such updates remove the line
//!
//! All derivation (subtotal, fees, discount, total, checkout gate) lives
//! in [`super::selectors`] as pure functions; the methods here are thin
//! delegates for callers that prefer method syntax.

use super::item::{CartLineItem, NewCartItem};
use super::selectors;
use crate::models::{DiscountType, LoyaltyCoupon, PromoCode};
use serde::{Deserialize, Serialize};

/// Minimum order value used until location data resolves
pub const FALLBACK_MIN_ORDER_VALUE: f64 = 35.0;
/// Delivery fee used until location data resolves
pub const FALLBACK_DELIVERY_FEE: f64 = 7.99;
/// Tip bounds; out-of-band values are clamped, not rejected
pub const TIP_MIN: f64 = 0.0;
pub const TIP_MAX: f64 = 200.0;

/// How the order reaches the customer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    #[default]
    Delivery,
    Pickup,
}

/// When the customer pays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[default]
    Online,
    PayOnPickup,
}

/// The cart aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<CartLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub delivery_type: DeliveryType,
    pub payment_type: PaymentType,
    /// Flat surcharge when paying at collection
    pub pay_on_pickup_fee: f64,
    /// At most one of promo_code / loyalty_coupon is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<PromoCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_coupon: Option<LoyaltyCoupon>,
    pub tip: f64,
    pub min_order_value: f64,
    pub base_delivery_fee: f64,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            location_id: None,
            delivery_type: DeliveryType::default(),
            payment_type: PaymentType::default(),
            pay_on_pickup_fee: 0.0,
            promo_code: None,
            loyalty_coupon: None,
            tip: 0.0,
            min_order_value: FALLBACK_MIN_ORDER_VALUE,
            base_delivery_fee: FALLBACK_DELIVERY_FEE,
        }
    }
}

impl CartState {
    // ==================== Mutators ====================

    /// Add an item, merging into an existing line when the configuration
    /// matches. Returns the id of the affected line. Never fails.
    pub fn add_item(&mut self, item: NewCartItem, now_millis: i64) -> String {
        let key = item.merge_key();
        if let Some(existing) = self.items.iter_mut().find(|l| l.merge_key() == key) {
            // Saturate rather than wrap: a wrapped negative quantity would
            // break the >= 1 invariant
            existing.quantity = existing.quantity.saturating_add(item.quantity.max(1));
            return existing.id.clone();
        }
        let line = item.into_line(now_millis);
        let id = line.id.clone();
        self.items.push(line);
        id
    }

    /// Replace a line's quantity. A quantity of zero or less removes the
    /// line instead of storing a non-positive value. No-op for unknown ids.
    pub fn update_quantity(&mut self, id: &str, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|l| l.id == id) {
            line.quantity = quantity;
        }
    }

    /// Remove a line. No-op for unknown ids.
    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|l| l.id != id);
    }

    /// Reset the order content: items, payment type, promo, coupon and tip.
    /// Location and delivery type are kept.
    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.payment_type = PaymentType::default();
        self.promo_code = None;
        self.loyalty_coupon = None;
        self.tip = 0.0;
    }

    /// Install a validated promo code. Clears any active loyalty coupon:
    /// at most one of the two may be active.
    ///
    /// The value/type must come from the server-side validation step; this
    /// mutator trusts its caller.
    pub fn set_promo_code(&mut self, code: &str, discount_value: f64, discount_type: DiscountType) {
        self.promo_code = Some(PromoCode::new(code, discount_value, discount_type));
        self.loyalty_coupon = None;
    }

    /// Clear the promo code only; an active coupon is untouched.
    pub fn clear_promo_code(&mut self) {
        self.promo_code = None;
    }

    /// Install a loyalty coupon. Clears any active promo code.
    pub fn set_loyalty_coupon(&mut self, coupon: LoyaltyCoupon) {
        self.loyalty_coupon = Some(coupon);
        self.promo_code = None;
    }

    /// Clear the coupon only; an active promo is untouched.
    pub fn clear_loyalty_coupon(&mut self) {
        self.loyalty_coupon = None;
    }

    /// Store a tip, silently clamped to the legal band.
    pub fn set_tip(&mut self, amount: f64) {
        self.tip = clamp_tip(amount);
    }

    /// Overwrite the location-derived defaults once location data resolves.
    pub fn set_location_config(&mut self, min_order_value: f64, delivery_fee: f64) {
        self.min_order_value = min_order_value;
        self.base_delivery_fee = delivery_fee;
    }

    pub fn set_delivery_type(&mut self, delivery_type: DeliveryType) {
        self.delivery_type = delivery_type;
    }

    pub fn set_payment_type(&mut self, payment_type: PaymentType) {
        self.payment_type = payment_type;
    }

    // ==================== Derived (delegates to selectors) ====================

    pub fn item_count(&self) -> i32 {
        selectors::item_count(self)
    }

    pub fn subtotal(&self) -> f64 {
        selectors::subtotal(self)
    }

    pub fn delivery_fee(&self) -> f64 {
        selectors::delivery_fee(self)
    }

    pub fn payment_fee(&self) -> f64 {
        selectors::payment_fee(self)
    }

    pub fn discount(&self) -> f64 {
        selectors::discount(self)
    }

    pub fn total(&self) -> f64 {
        selectors::total(self)
    }

    pub fn can_checkout(&self) -> selectors::CheckoutEligibility {
        selectors::can_checkout(self)
    }
}

fn clamp_tip(amount: f64) -> f64 {
    if !amount.is_finite() {
        return TIP_MIN;
    }
    amount.clamp(TIP_MIN, TIP_MAX)
}

/// The subset of the cart that survives a session.
///
/// Promo, coupon, tip and payment type are transient and restart at
/// their defaults on rehydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCart {
    pub items: Vec<CartLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub delivery_type: DeliveryType,
}

impl PersistedCart {
    pub fn from_state(state: &CartState) -> Self {
        Self {
            items: state.items.clone(),
            location_id: state.location_id.clone(),
            delivery_type: state.delivery_type,
        }
    }

    /// Rebuild a cart from persisted data, dropping malformed items.
    ///
    /// An item survives only with a finite, non-NaN unit price, a
    /// non-empty product id and a positive quantity.
    pub fn restore(self) -> CartState {
        let items = self
            .items
            .into_iter()
            .filter(|item| {
                item.unit_price.is_finite() && !item.product_id.is_empty() && item.quantity >= 1
            })
            .collect();

        CartState {
            items,
            location_id: self.location_id,
            delivery_type: self.delivery_type,
            ..CartState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CouponType;

    fn new_item(product_id: &str, price: f64, quantity: i32) -> NewCartItem {
        NewCartItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            unit_price: price,
            quantity,
            variant_id: None,
            variant_name: None,
            variant_price_delta: None,
            spice_level: None,
            notes: None,
            image: None,
            addons: vec![],
        }
    }

    fn coupon(coupon_type: CouponType, value: Option<f64>) -> LoyaltyCoupon {
        LoyaltyCoupon {
            id: "c-1".to_string(),
            code: "RW-TESTTEST42".to_string(),
            coupon_type,
            discount_value: value,
            free_product_name: None,
            expires_at: i64::MAX,
        }
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_identical_configurations_merge() {
        let mut cart = CartState::default();
        cart.add_item(new_item("ramen-1", 12.0, 1), 1);
        cart.add_item(new_item("ramen-1", 12.0, 2), 2);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
    }

    #[test]
    fn test_distinct_configurations_stay_separate() {
        let mut cart = CartState::default();
        cart.add_item(new_item("ramen-1", 12.0, 1), 1);
        let mut spicy = new_item("ramen-1", 12.0, 1);
        spicy.spice_level = Some(3);
        cart.add_item(spicy, 2);

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_merge_returns_existing_line_id() {
        let mut cart = CartState::default();
        let first = cart.add_item(new_item("ramen-1", 12.0, 1), 1);
        let second = cart.add_item(new_item("ramen-1", 12.0, 1), 99);
        assert_eq!(first, second);
    }

    // ==================== Quantity Tests ====================

    #[test]
    fn test_merge_saturates_instead_of_wrapping() {
        let mut cart = CartState::default();
        cart.add_item(new_item("ramen-1", 12.0, i32::MAX - 1), 1);
        cart.add_item(new_item("ramen-1", 12.0, i32::MAX), 2);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, i32::MAX);
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = CartState::default();
        let id = cart.add_item(new_item("ramen-1", 12.0, 2), 1);
        cart.update_quantity(&id, 0);
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_update_quantity_negative_removes_line() {
        let mut cart = CartState::default();
        let id = cart.add_item(new_item("ramen-1", 12.0, 2), 1);
        cart.update_quantity(&id, -5);
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_update_quantity_unknown_id_is_noop() {
        let mut cart = CartState::default();
        cart.add_item(new_item("ramen-1", 12.0, 2), 1);
        cart.update_quantity("missing", 5);
        assert_eq!(cart.items[0].quantity, 2);
    }

    // ==================== Mutual Exclusion Tests ====================

    #[test]
    fn test_coupon_clears_promo() {
        let mut cart = CartState::default();
        cart.set_promo_code("welcome10", 10.0, DiscountType::Percent);
        assert_eq!(cart.promo_code.as_ref().unwrap().code, "WELCOME10");

        cart.set_loyalty_coupon(coupon(CouponType::Discount, Some(5.0)));
        assert!(cart.promo_code.is_none());
        assert!(cart.loyalty_coupon.is_some());
    }

    #[test]
    fn test_promo_clears_coupon() {
        let mut cart = CartState::default();
        cart.set_loyalty_coupon(coupon(CouponType::Discount, Some(5.0)));
        cart.set_promo_code("X", 10.0, DiscountType::Percent);
        assert!(cart.loyalty_coupon.is_none());
        assert!(cart.promo_code.is_some());
    }

    #[test]
    fn test_clear_promo_leaves_coupon() {
        let mut cart = CartState::default();
        cart.set_loyalty_coupon(coupon(CouponType::FreeDelivery, None));
        cart.clear_promo_code();
        assert!(cart.loyalty_coupon.is_some());
    }

    // ==================== Tip Tests ====================

    #[test]
    fn test_tip_clamped_high() {
        let mut cart = CartState::default();
        cart.set_tip(500.0);
        assert_eq!(cart.tip, 200.0);
    }

    #[test]
    fn test_tip_clamped_low() {
        let mut cart = CartState::default();
        cart.set_tip(-10.0);
        assert_eq!(cart.tip, 0.0);
    }

    #[test]
    fn test_tip_nan_clamped_to_zero() {
        let mut cart = CartState::default();
        cart.set_tip(f64::NAN);
        assert_eq!(cart.tip, 0.0);
    }

    // ==================== Clear Tests ====================

    #[test]
    fn test_clear_cart_resets_order_content_only() {
        let mut cart = CartState::default();
        cart.location_id = Some("loc-1".to_string());
        cart.set_delivery_type(DeliveryType::Pickup);
        cart.set_payment_type(PaymentType::PayOnPickup);
        cart.add_item(new_item("ramen-1", 12.0, 1), 1);
        cart.set_promo_code("X", 10.0, DiscountType::Percent);
        cart.set_tip(5.0);

        cart.clear_cart();

        assert!(cart.items.is_empty());
        assert_eq!(cart.payment_type, PaymentType::Online);
        assert!(cart.promo_code.is_none());
        assert!(cart.loyalty_coupon.is_none());
        assert_eq!(cart.tip, 0.0);
        // Kept
        assert_eq!(cart.location_id.as_deref(), Some("loc-1"));
        assert_eq!(cart.delivery_type, DeliveryType::Pickup);
    }

    // ==================== Persistence Tests ====================

    #[test]
    fn test_persisted_subset() {
        let mut cart = CartState::default();
        cart.location_id = Some("loc-1".to_string());
        cart.add_item(new_item("ramen-1", 12.0, 1), 1);
        cart.set_promo_code("X", 10.0, DiscountType::Percent);
        cart.set_tip(20.0);

        let restored = PersistedCart::from_state(&cart).restore();

        assert_eq!(restored.items.len(), 1);
        assert_eq!(restored.location_id.as_deref(), Some("loc-1"));
        // Transient fields restart at defaults
        assert!(restored.promo_code.is_none());
        assert_eq!(restored.tip, 0.0);
        assert_eq!(restored.payment_type, PaymentType::Online);
    }

    #[test]
    fn test_restore_drops_malformed_items() {
        let mut cart = CartState::default();
        cart.add_item(new_item("ramen-1", 12.0, 1), 1);

        let mut persisted = PersistedCart::from_state(&cart);
        let mut nan_price = persisted.items[0].clone();
        nan_price.id = "bad-price".to_string();
        nan_price.unit_price = f64::NAN;
        let mut no_product = persisted.items[0].clone();
        no_product.id = "bad-product".to_string();
        no_product.product_id = String::new();
        let mut zero_qty = persisted.items[0].clone();
        zero_qty.id = "bad-qty".to_string();
        zero_qty.quantity = 0;
        persisted.items.extend([nan_price, no_product, zero_qty]);

        let restored = persisted.restore();
        assert_eq!(restored.items.len(), 1);
        assert_eq!(restored.items[0].product_id, "ramen-1");
    }

    #[test]
    fn test_location_config_overrides_fallbacks() {
        let mut cart = CartState::default();
        assert_eq!(cart.min_order_value, FALLBACK_MIN_ORDER_VALUE);
        assert_eq!(cart.base_delivery_fee, FALLBACK_DELIVERY_FEE);

        cart.set_location_config(20.0, 4.5);
        assert_eq!(cart.min_order_value, 20.0);
        assert_eq!(cart.base_delivery_fee, 4.5);
    }
}

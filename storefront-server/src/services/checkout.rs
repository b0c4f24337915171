//! Order placement
//!
//! Checkout freezes the cart into an [`OrderDraft`], routes online
//! payments through the gateway and finalizes everything else
//! immediately. Finalization is where side effects land: the promo
//! usage counter, the coupon consumption, the user's order count and
//! the cart reset.

use serde::{Deserialize, Serialize};
use shared::cart::{CartLineItem, CartState, DeliveryType, PaymentType};
use shared::error::{AppError, AppResult, ErrorCode};
use std::sync::Arc;
use uuid::Uuid;

use super::cart::CartService;
use super::loyalty::LoyaltyService;
use super::payment::{PaymentGateway, PaymentNotification, RedirectToken};
use super::promo::PromoService;
use crate::storage::StorefrontStorage;

/// A cart frozen at checkout time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_ref: String,
    pub user_id: String,
    pub items: Vec<CartLineItem>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub payment_fee: f64,
    pub discount: f64,
    pub tip: f64,
    pub total: f64,
    pub delivery_type: DeliveryType,
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_coupon_id: Option<String>,
    pub created_at: i64,
}

impl OrderDraft {
    fn from_cart(user_id: &str, cart: &CartState, now_millis: i64) -> Self {
        Self {
            order_ref: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            items: cart.items.clone(),
            subtotal: cart.subtotal(),
            delivery_fee: cart.delivery_fee(),
            payment_fee: cart.payment_fee(),
            discount: cart.discount(),
            tip: cart.tip,
            total: cart.total(),
            delivery_type: cart.delivery_type,
            payment_type: cart.payment_type,
            promo_code: cart.promo_code.as_ref().map(|p| p.code.clone()),
            loyalty_coupon_id: cart.loyalty_coupon.as_ref().map(|c| c.id.clone()),
            created_at: now_millis,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Finalized, no payment redirect needed
    Confirmed,
    /// Parked until the payment notification arrives
    AwaitingPayment,
    /// Payment failed or was cancelled; the order was dropped
    Cancelled,
}

/// Result of placing an order
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order_ref: String,
    pub status: OrderStatus,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectToken>,
}

#[derive(Clone)]
pub struct CheckoutService {
    storage: StorefrontStorage,
    carts: CartService,
    promos: PromoService,
    loyalty: LoyaltyService,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        storage: StorefrontStorage,
        carts: CartService,
        promos: PromoService,
        loyalty: LoyaltyService,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            storage,
            carts,
            promos,
            loyalty,
            gateway,
        }
    }

    /// Place an order from the user's current cart.
    ///
    /// The eligibility gate is advisory for display but binding here: an
    /// empty cart or a subtotal below the location minimum is rejected.
    pub fn place_order(&self, user_id: &str, now_millis: i64) -> AppResult<CheckoutOutcome> {
        let cart = self.carts.snapshot(user_id);
        let verdict = cart.can_checkout();
        if !verdict.allowed {
            let reason = verdict.reason.unwrap_or_default();
            let code = if cart.items.is_empty() {
                ErrorCode::CartEmpty
            } else {
                ErrorCode::ValidationFailed
            };
            return Err(AppError::with_message(code, reason));
        }

        let draft = OrderDraft::from_cart(user_id, &cart, now_millis);

        if draft.payment_type == PaymentType::Online {
            let redirect = self.gateway.register_transaction(&draft)?;
            self.storage.save_pending_order(&draft)?;
            tracing::info!(
                "Order {} awaiting payment, total {:.2}",
                draft.order_ref,
                draft.total
            );
            return Ok(CheckoutOutcome {
                order_ref: draft.order_ref,
                status: OrderStatus::AwaitingPayment,
                total: draft.total,
                redirect: Some(redirect),
            });
        }

        self.finalize(&draft, now_millis)?;
        Ok(CheckoutOutcome {
            order_ref: draft.order_ref,
            status: OrderStatus::Confirmed,
            total: draft.total,
            redirect: None,
        })
    }

    /// Handle the provider's signed payment notification.
    ///
    /// A paid outcome finalizes the parked order; a failed or cancelled
    /// outcome drops it and leaves the cart as it was at checkout.
    pub fn handle_notification(
        &self,
        notification: &PaymentNotification,
        now_millis: i64,
    ) -> AppResult<OrderStatus> {
        self.gateway.verify_notification(notification)?;

        let draft = self
            .storage
            .take_pending_order(&notification.order_ref)?
            .ok_or_else(|| {
                AppError::not_found(format!("Pending order {}", notification.order_ref))
            })?;

        if !notification.is_paid() {
            tracing::info!(
                "Order {} not paid (status {}), releasing",
                draft.order_ref,
                notification.status
            );
            return Ok(OrderStatus::Cancelled);
        }

        self.finalize(&draft, now_millis)?;
        Ok(OrderStatus::Confirmed)
    }

    /// Apply a completed order's side effects
    fn finalize(&self, draft: &OrderDraft, now_millis: i64) -> AppResult<()> {
        if let Some(code) = &draft.promo_code {
            self.promos.redeem(code)?;
        }
        if let Some(coupon_id) = &draft.loyalty_coupon_id {
            self.loyalty.mark_used(coupon_id, now_millis)?;
        }
        self.storage.increment_order_count(&draft.user_id)?;
        self.carts.reset_after_order(&draft.user_id)?;
        tracing::info!("Order {} confirmed, total {:.2}", draft.order_ref, draft.total);
        Ok(())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment::notification_digest;
    use shared::cart::NewCartItem;
    use shared::models::{CouponType, LoyaltyAccount, LoyaltyReward};

    const SECRET: &str = "s3cret";

    struct Fixture {
        storage: StorefrontStorage,
        carts: CartService,
        loyalty: LoyaltyService,
        checkout: CheckoutService,
    }

    fn fixture() -> Fixture {
        let storage = StorefrontStorage::open_in_memory().unwrap();
        let carts = CartService::new(storage.clone());
        let promos = PromoService::new(storage.clone());
        let loyalty = LoyaltyService::new(storage.clone());
        let gateway = Arc::new(super::super::payment::HostedCheckoutGateway::new(
            "https://pay.example.com",
            SECRET,
        ));
        let checkout = CheckoutService::new(
            storage.clone(),
            carts.clone(),
            promos,
            loyalty.clone(),
            gateway,
        );
        Fixture {
            storage,
            carts,
            loyalty,
            checkout,
        }
    }

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

    #[test]
    fn test_empty_cart_rejected() {
        let f = fixture();
        let err = f.checkout.place_order("user-1", 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartEmpty);
    }

    #[test]
    fn test_below_minimum_rejected_with_reason() {
        let f = fixture();
        f.carts.add_item("user-1", new_item("gyoza-1", 10.0, 1)).unwrap();
        let err = f.checkout.place_order("user-1", 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("minimum order value"));
    }

    #[test]
    fn test_pay_on_pickup_confirms_immediately() {
        let f = fixture();
        f.carts.add_item("user-1", new_item("ramen-1", 36.0, 2)).unwrap();
        f.carts
            .set_delivery_type("user-1", DeliveryType::Pickup)
            .unwrap();
        f.carts
            .set_payment_type("user-1", PaymentType::PayOnPickup)
            .unwrap();

        let outcome = f.checkout.place_order("user-1", 1_000).unwrap();
        assert_eq!(outcome.status, OrderStatus::Confirmed);
        assert_eq!(outcome.total, 72.0);
        assert!(outcome.redirect.is_none());

        assert_eq!(f.storage.order_count("user-1").unwrap(), 1);
        assert!(f.carts.quote("user-1").items.is_empty());
    }

    #[test]
    fn test_online_order_parks_until_notification() {
        let f = fixture();
        f.carts.add_item("user-1", new_item("ramen-1", 36.0, 2)).unwrap();

        let outcome = f.checkout.place_order("user-1", 1_000).unwrap();
        assert_eq!(outcome.status, OrderStatus::AwaitingPayment);
        let redirect = outcome.redirect.unwrap();
        assert!(redirect.redirect_url.contains(&outcome.order_ref));

        // Nothing finalized yet
        assert_eq!(f.storage.order_count("user-1").unwrap(), 0);
        assert_eq!(f.carts.quote("user-1").item_count, 2);

        let notification = PaymentNotification {
            order_ref: outcome.order_ref.clone(),
            amount: outcome.total,
            status: "paid".to_string(),
            signature: notification_digest(&outcome.order_ref, outcome.total, "paid", SECRET),
        };
        let status = f.checkout.handle_notification(&notification, 2_000).unwrap();
        assert_eq!(status, OrderStatus::Confirmed);
        assert_eq!(f.storage.order_count("user-1").unwrap(), 1);
        assert!(f.carts.quote("user-1").items.is_empty());

        // Replay is rejected: the pending order is gone
        let err = f.checkout.handle_notification(&notification, 3_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_bad_signature_rejected_before_lookup() {
        let f = fixture();
        let notification = PaymentNotification {
            order_ref: "ord-x".to_string(),
            amount: 10.0,
            status: "paid".to_string(),
            signature: "forged".to_string(),
        };
        let err = f.checkout.handle_notification(&notification, 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentInvalidSignature);
    }

    #[test]
    fn test_failed_payment_keeps_cart() {
        let f = fixture();
        f.carts.add_item("user-1", new_item("ramen-1", 36.0, 2)).unwrap();
        let outcome = f.checkout.place_order("user-1", 1_000).unwrap();

        let notification = PaymentNotification {
            order_ref: outcome.order_ref.clone(),
            amount: outcome.total,
            status: "failed".to_string(),
            signature: notification_digest(&outcome.order_ref, outcome.total, "failed", SECRET),
        };
        let status = f.checkout.handle_notification(&notification, 2_000).unwrap();
        assert_eq!(status, OrderStatus::Cancelled);

        assert_eq!(f.storage.order_count("user-1").unwrap(), 0);
        assert_eq!(f.carts.quote("user-1").item_count, 2);
    }

    #[test]
    fn test_finalize_consumes_coupon_and_resets_cart() {
        let f = fixture();
        f.storage
            .put_account(&LoyaltyAccount {
                user_id: "user-1".to_string(),
                points_balance: 500,
                tier_rank: 2,
                created_at: 0,
                updated_at: 0,
            })
            .unwrap();
        f.storage
            .upsert_reward(&LoyaltyReward {
                id: "r-1".to_string(),
                name: "10 off".to_string(),
                coupon_type: CouponType::Discount,
                discount_value: Some(10.0),
                free_product_name: None,
                points_cost: 200,
                min_tier_rank: 1,
                valid_days: 30,
                is_active: true,
            })
            .unwrap();
        let coupon = f.loyalty.activate("user-1", "r-1", 1_000).unwrap();

        f.carts.add_item("user-1", new_item("ramen-1", 36.0, 2)).unwrap();
        f.carts
            .set_delivery_type("user-1", DeliveryType::Pickup)
            .unwrap();
        f.carts
            .set_payment_type("user-1", PaymentType::PayOnPickup)
            .unwrap();
        f.carts.apply_coupon("user-1", coupon.clone()).unwrap();

        let outcome = f.checkout.place_order("user-1", 2_000).unwrap();
        assert_eq!(outcome.total, 62.0);

        // Coupon consumed and no longer active
        assert!(f.loyalty.active_coupon("user-1", 3_000).unwrap().is_none());
        let err = f.loyalty.coupon_for_cart("user-1", &coupon.id, 3_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponAlreadyUsed);
    }
}

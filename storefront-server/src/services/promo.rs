//! Promo code validation and redemption
//!
//! Validation runs against the catalog definition at apply time and
//! returns a [`PromoAcceptance`] carrying only what the cart needs.
//! Usage counters are bumped at order completion, not at apply time, so
//! an abandoned cart never burns a use.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::PromoAcceptance;

use crate::storage::StorefrontStorage;

#[derive(Clone)]
pub struct PromoService {
    storage: StorefrontStorage,
}

impl PromoService {
    pub fn new(storage: StorefrontStorage) -> Self {
        Self { storage }
    }

    /// Validate a code against the catalog for this user and cart.
    ///
    /// Checks run in order: existence, active flag, validity window,
    /// minimum subtotal, usage limit, first-order restriction. The first
    /// failing check decides the error.
    pub fn validate(
        &self,
        user_id: &str,
        code: &str,
        cart_subtotal: f64,
        now_millis: i64,
    ) -> AppResult<PromoAcceptance> {
        let promo = self
            .storage
            .get_promo(code)?
            .ok_or_else(|| AppError::new(ErrorCode::PromoNotFound))?;

        if !promo.is_active {
            return Err(AppError::new(ErrorCode::PromoInactive));
        }
        if let Some(from) = promo.valid_from {
            if now_millis < from {
                return Err(AppError::new(ErrorCode::PromoNotYetValid)
                    .with_detail("valid_from", from));
            }
        }
        if let Some(until) = promo.valid_until {
            if now_millis > until {
                return Err(AppError::new(ErrorCode::PromoExpired));
            }
        }
        if let Some(min) = promo.min_order_value {
            if cart_subtotal < min {
                return Err(AppError::new(ErrorCode::PromoBelowMinimum)
                    .with_detail("min_order_value", min)
                    .with_detail("subtotal", cart_subtotal));
            }
        }
        if let Some(limit) = promo.usage_limit {
            if promo.usage_count >= limit {
                return Err(AppError::new(ErrorCode::PromoUsageExhausted));
            }
        }
        if promo.first_order_only && self.storage.order_count(user_id)? > 0 {
            return Err(AppError::new(ErrorCode::PromoFirstOrderOnly));
        }

        Ok(PromoAcceptance::from(&promo))
    }

    /// Burn one use of a code. Called when its order completes.
    pub fn redeem(&self, code: &str) -> AppResult<()> {
        self.storage.increment_promo_usage(code)?;
        Ok(())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DiscountType, PromoDefinition};

    fn promo(code: &str) -> PromoDefinition {
        PromoDefinition {
            code: code.to_string(),
            discount_type: DiscountType::Percent,
            discount_value: 10.0,
            free_product_id: None,
            is_active: true,
            valid_from: None,
            valid_until: None,
            min_order_value: None,
            usage_limit: None,
            usage_count: 0,
            first_order_only: false,
            created_at: 0,
        }
    }

    fn service_with(promos: Vec<PromoDefinition>) -> (PromoService, StorefrontStorage) {
        let storage = StorefrontStorage::open_in_memory().unwrap();
        for p in &promos {
            storage.upsert_promo(p).unwrap();
        }
        (PromoService::new(storage.clone()), storage)
    }

    #[test]
    fn test_valid_code_accepted_case_insensitively() {
        let (service, _) = service_with(vec![promo("WELCOME10")]);
        let accepted = service.validate("user-1", "welcome10", 50.0, 1000).unwrap();
        assert_eq!(accepted.code, "WELCOME10");
        assert_eq!(accepted.discount_value, 10.0);
    }

    #[test]
    fn test_unknown_code_rejected() {
        let (service, _) = service_with(vec![]);
        let err = service.validate("user-1", "NOPE", 50.0, 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PromoNotFound);
    }

    #[test]
    fn test_inactive_code_rejected() {
        let mut p = promo("OLD");
        p.is_active = false;
        let (service, _) = service_with(vec![p]);
        let err = service.validate("user-1", "OLD", 50.0, 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PromoInactive);
    }

    #[test]
    fn test_validity_window_enforced() {
        let mut p = promo("WINDOW");
        p.valid_from = Some(1000);
        p.valid_until = Some(2000);
        let (service, _) = service_with(vec![p]);

        assert_eq!(
            service.validate("user-1", "WINDOW", 50.0, 500).unwrap_err().code,
            ErrorCode::PromoNotYetValid
        );
        assert!(service.validate("user-1", "WINDOW", 50.0, 1500).is_ok());
        assert_eq!(
            service.validate("user-1", "WINDOW", 50.0, 2500).unwrap_err().code,
            ErrorCode::PromoExpired
        );
    }

    #[test]
    fn test_minimum_subtotal_enforced() {
        let mut p = promo("BIG");
        p.min_order_value = Some(40.0);
        let (service, _) = service_with(vec![p]);

        let err = service.validate("user-1", "BIG", 39.99, 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PromoBelowMinimum);
        assert!(service.validate("user-1", "BIG", 40.0, 1000).is_ok());
    }

    #[test]
    fn test_usage_limit_enforced() {
        let mut p = promo("LIMITED");
        p.usage_limit = Some(2);
        p.usage_count = 1;
        let (service, storage) = service_with(vec![p]);

        assert!(service.validate("user-1", "LIMITED", 50.0, 1000).is_ok());
        service.redeem("LIMITED").unwrap();
        assert_eq!(
            storage.get_promo("LIMITED").unwrap().unwrap().usage_count,
            2
        );
        let err = service.validate("user-1", "LIMITED", 50.0, 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PromoUsageExhausted);
    }

    #[test]
    fn test_first_order_only_enforced() {
        let mut p = promo("FIRST");
        p.first_order_only = true;
        let (service, storage) = service_with(vec![p]);

        assert!(service.validate("user-1", "FIRST", 50.0, 1000).is_ok());
        storage.increment_order_count("user-1").unwrap();
        let err = service.validate("user-1", "FIRST", 50.0, 1000).unwrap_err();
        assert_eq!(err.code, ErrorCode::PromoFirstOrderOnly);
        // Another user still qualifies
        assert!(service.validate("user-2", "FIRST", 50.0, 1000).is_ok());
    }
}

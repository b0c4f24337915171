//! Loyalty rewards: points, tiers and coupon activation
//!
//! Activating a reward is the one multi-step write in the system:
//! points are deducted first, then the coupon is inserted. The insert
//! enforces the one-active-coupon-per-user invariant, so a concurrent
//! activation can fail after the deduction; that path re-credits the
//! points and records both movements in the ledger.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CouponStatus, LedgerEntry, LedgerReason, LoyaltyAccount, LoyaltyCoupon, LoyaltyReward,
    StoredCoupon,
};
use uuid::Uuid;

use crate::storage::{StorageError, StorefrontStorage};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Clone)]
pub struct LoyaltyService {
    storage: StorefrontStorage,
}

impl LoyaltyService {
    pub fn new(storage: StorefrontStorage) -> Self {
        Self { storage }
    }

    pub fn account(&self, user_id: &str) -> AppResult<LoyaltyAccount> {
        Ok(self
            .storage
            .get_account(user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::LoyaltyAccountNotFound))?)
    }

    pub fn rewards(&self) -> AppResult<Vec<LoyaltyReward>> {
        let mut rewards = self.storage.list_rewards()?;
        rewards.retain(|r| r.is_active);
        Ok(rewards)
    }

    /// The user's active coupon, with lazy expiry: a coupon past its
    /// expiry is flipped to Expired on read and reported as absent.
    pub fn active_coupon(&self, user_id: &str, now_millis: i64) -> AppResult<Option<LoyaltyCoupon>> {
        let Some(stored) = self.storage.active_coupon_for_user(user_id)? else {
            return Ok(None);
        };
        if stored.coupon.expires_at < now_millis {
            self.storage
                .set_coupon_status(&stored.coupon.id, CouponStatus::Expired, now_millis)?;
            return Ok(None);
        }
        Ok(Some(stored.coupon))
    }

    /// Exchange points for a reward coupon.
    ///
    /// Pre-checks reject the obvious failures before any write: unknown or
    /// inactive reward, missing account, an already-active coupon, too few
    /// points, too low a tier.
    pub fn activate(
        &self,
        user_id: &str,
        reward_id: &str,
        now_millis: i64,
    ) -> AppResult<LoyaltyCoupon> {
        let reward = self
            .storage
            .get_reward(reward_id)?
            .filter(|r| r.is_active)
            .ok_or_else(|| AppError::new(ErrorCode::RewardNotFound))?;
        let account = self.account(user_id)?;

        if self.active_coupon(user_id, now_millis)?.is_some() {
            return Err(AppError::new(ErrorCode::CouponAlreadyActive));
        }
        if account.points_balance < reward.points_cost {
            return Err(AppError::new(ErrorCode::InsufficientPoints)
                .with_detail("balance", account.points_balance)
                .with_detail("required", reward.points_cost));
        }
        if account.tier_rank < reward.min_tier_rank {
            return Err(AppError::new(ErrorCode::TierTooLow)
                .with_detail("tier_rank", account.tier_rank as i64)
                .with_detail("required", reward.min_tier_rank as i64));
        }

        self.settle_activation(user_id, &reward, now_millis)
    }

    /// Deduct the points and insert the coupon.
    ///
    /// The two writes are separate transactions. If the insert loses the
    /// uniqueness race the deduction is compensated with a re-credit, and
    /// both movements land in the ledger so the balance history stays
    /// explainable.
    fn settle_activation(
        &self,
        user_id: &str,
        reward: &LoyaltyReward,
        now_millis: i64,
    ) -> AppResult<LoyaltyCoupon> {
        let coupon = issue_coupon(reward, now_millis);

        self.storage
            .adjust_points(user_id, -reward.points_cost, now_millis)?;
        self.append_ledger(
            user_id,
            -reward.points_cost,
            LedgerReason::CouponActivated,
            &coupon.id,
            now_millis,
        )?;

        let stored = StoredCoupon {
            coupon: coupon.clone(),
            user_id: user_id.to_string(),
            status: CouponStatus::Active,
            created_at: now_millis,
            used_at: None,
        };
        match self.storage.insert_coupon(&stored) {
            Ok(()) => Ok(coupon),
            Err(StorageError::ActiveCouponExists(_)) => {
                tracing::warn!(
                    "Coupon insert for {} lost the uniqueness race, re-crediting {} points",
                    user_id,
                    reward.points_cost
                );
                self.storage
                    .adjust_points(user_id, reward.points_cost, now_millis)?;
                self.append_ledger(
                    user_id,
                    reward.points_cost,
                    LedgerReason::ActivationRolledBack,
                    &coupon.id,
                    now_millis,
                )?;
                Err(AppError::new(ErrorCode::CouponAlreadyActive))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn append_ledger(
        &self,
        user_id: &str,
        delta: i64,
        reason: LedgerReason,
        coupon_id: &str,
        now_millis: i64,
    ) -> AppResult<()> {
        self.storage.append_ledger(&LedgerEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            delta,
            reason,
            coupon_id: Some(coupon_id.to_string()),
            created_at: now_millis,
        })?;
        Ok(())
    }

    /// Fetch a coupon for use in the cart, enforcing ownership, status and
    /// expiry
    pub fn coupon_for_cart(
        &self,
        user_id: &str,
        coupon_id: &str,
        now_millis: i64,
    ) -> AppResult<LoyaltyCoupon> {
        let stored = self
            .storage
            .get_coupon(coupon_id)?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| AppError::new(ErrorCode::CouponNotFound))?;
        match stored.status {
            CouponStatus::Used => return Err(AppError::new(ErrorCode::CouponAlreadyUsed)),
            CouponStatus::Expired => return Err(AppError::new(ErrorCode::CouponExpired)),
            CouponStatus::Active => {}
        }
        if stored.coupon.expires_at < now_millis {
            self.storage
                .set_coupon_status(coupon_id, CouponStatus::Expired, now_millis)?;
            return Err(AppError::new(ErrorCode::CouponExpired));
        }
        Ok(stored.coupon)
    }

    /// Consume a coupon when its order completes
    pub fn mark_used(&self, coupon_id: &str, now_millis: i64) -> AppResult<()> {
        self.storage
            .set_coupon_status(coupon_id, CouponStatus::Used, now_millis)?;
        Ok(())
    }

    pub fn ledger(&self, user_id: &str) -> AppResult<Vec<LedgerEntry>> {
        Ok(self.storage.ledger_for_user(user_id)?)
    }
}

/// Mint a coupon from a reward definition
fn issue_coupon(reward: &LoyaltyReward, now_millis: i64) -> LoyaltyCoupon {
    LoyaltyCoupon {
        id: Uuid::new_v4().to_string(),
        code: shared::util::coupon_code(),
        coupon_type: reward.coupon_type,
        discount_value: reward.discount_value,
        free_product_name: reward.free_product_name.clone(),
        expires_at: now_millis + reward.valid_days as i64 * MILLIS_PER_DAY,
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::CouponType;

    fn account(user_id: &str, points: i64, tier: u8) -> LoyaltyAccount {
        LoyaltyAccount {
            user_id: user_id.to_string(),
            points_balance: points,
            tier_rank: tier,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn reward(id: &str, cost: i64, min_tier: u8) -> LoyaltyReward {
        LoyaltyReward {
            id: id.to_string(),
            name: "Free delivery".to_string(),
            coupon_type: CouponType::FreeDelivery,
            discount_value: None,
            free_product_name: None,
            points_cost: cost,
            min_tier_rank: min_tier,
            valid_days: 30,
            is_active: true,
        }
    }

    fn setup(points: i64, tier: u8) -> (LoyaltyService, StorefrontStorage) {
        let storage = StorefrontStorage::open_in_memory().unwrap();
        storage.put_account(&account("user-1", points, tier)).unwrap();
        storage.upsert_reward(&reward("r-1", 200, 1)).unwrap();
        (LoyaltyService::new(storage.clone()), storage)
    }

    #[test]
    fn test_activation_deducts_points_and_issues_coupon() {
        let (service, storage) = setup(500, 2);
        let coupon = service.activate("user-1", "r-1", 1_000).unwrap();

        assert!(coupon.code.starts_with("RW-"));
        assert_eq!(coupon.expires_at, 1_000 + 30 * MILLIS_PER_DAY);
        assert_eq!(
            storage.get_account("user-1").unwrap().unwrap().points_balance,
            300
        );

        let ledger = service.ledger("user-1").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].delta, -200);

        let active = service.active_coupon("user-1", 1_000).unwrap().unwrap();
        assert_eq!(active.id, coupon.id);
    }

    #[test]
    fn test_activation_rejects_insufficient_points() {
        let (service, storage) = setup(100, 2);
        let err = service.activate("user-1", "r-1", 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientPoints);
        assert_eq!(
            storage.get_account("user-1").unwrap().unwrap().points_balance,
            100
        );
    }

    #[test]
    fn test_activation_rejects_low_tier() {
        let storage = StorefrontStorage::open_in_memory().unwrap();
        storage.put_account(&account("user-1", 500, 0)).unwrap();
        storage.upsert_reward(&reward("r-1", 200, 2)).unwrap();
        let service = LoyaltyService::new(storage);

        let err = service.activate("user-1", "r-1", 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::TierTooLow);
    }

    #[test]
    fn test_activation_rejects_second_active_coupon() {
        let (service, _) = setup(500, 2);
        service.activate("user-1", "r-1", 1_000).unwrap();
        let err = service.activate("user-1", "r-1", 2_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponAlreadyActive);
    }

    #[test]
    fn test_lost_insert_race_recredits_points() {
        // Simulate losing the uniqueness race: another activation lands
        // between the pre-check and the insert by calling the settle step
        // directly with a coupon already in place.
        let (service, storage) = setup(500, 2);
        service.activate("user-1", "r-1", 1_000).unwrap();
        assert_eq!(
            storage.get_account("user-1").unwrap().unwrap().points_balance,
            300
        );

        let err = service
            .settle_activation("user-1", &reward("r-1", 200, 1), 2_000)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CouponAlreadyActive);

        // Balance is back where it started and both movements are recorded
        assert_eq!(
            storage.get_account("user-1").unwrap().unwrap().points_balance,
            300
        );
        let mut deltas: Vec<i64> = service
            .ledger("user-1")
            .unwrap()
            .iter()
            .map(|e| e.delta)
            .collect();
        deltas.sort_unstable();
        assert_eq!(deltas, vec![-200, -200, 200]);
    }

    #[test]
    fn test_expired_coupon_hidden_and_flipped() {
        let (service, storage) = setup(500, 2);
        let coupon = service.activate("user-1", "r-1", 1_000).unwrap();

        let later = coupon.expires_at + 1;
        assert!(service.active_coupon("user-1", later).unwrap().is_none());
        let stored = storage.get_coupon(&coupon.id).unwrap().unwrap();
        assert_eq!(stored.status, CouponStatus::Expired);
    }

    #[test]
    fn test_coupon_for_cart_enforces_ownership_and_status() {
        let (service, _) = setup(500, 2);
        let coupon = service.activate("user-1", "r-1", 1_000).unwrap();

        assert_eq!(
            service
                .coupon_for_cart("user-2", &coupon.id, 1_000)
                .unwrap_err()
                .code,
            ErrorCode::CouponNotFound
        );

        service.mark_used(&coupon.id, 2_000).unwrap();
        assert_eq!(
            service
                .coupon_for_cart("user-1", &coupon.id, 3_000)
                .unwrap_err()
                .code,
            ErrorCode::CouponAlreadyUsed
        );
    }

    #[test]
    fn test_inactive_reward_not_listed_or_activatable() {
        let (service, storage) = setup(500, 2);
        let mut r = reward("r-2", 100, 1);
        r.is_active = false;
        storage.upsert_reward(&r).unwrap();

        assert_eq!(service.rewards().unwrap().len(), 1);
        let err = service.activate("user-1", "r-2", 1_000).unwrap_err();
        assert_eq!(err.code, ErrorCode::RewardNotFound);
    }
}

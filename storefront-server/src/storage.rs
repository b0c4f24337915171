//! redb-based storage layer for the storefront
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `carts` | `user_id` | `PersistedCart` | Saved cart subset |
//! | `locations` | `location_id` | `StoreLocation` | Store location config |
//! | `promo_codes` | `code` | `PromoDefinition` | Promo catalog + usage counters |
//! | `user_orders` | `user_id` | `u64` | Completed order count |
//! | `loyalty_accounts` | `user_id` | `LoyaltyAccount` | Points + tier |
//! | `loyalty_rewards` | `reward_id` | `LoyaltyReward` | Redeemable reward catalog |
//! | `loyalty_coupons` | `coupon_id` | `StoredCoupon` | Issued coupons |
//! | `loyalty_ledger` | `(user_id, entry_id)` | `LedgerEntry` | Points audit trail |
//! | `pending_orders` | `order_ref` | `OrderDraft` | Orders awaiting payment |
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns; the file is
//! always left in a consistent state, so an unclean shutdown loses at most
//! the in-flight transaction.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::cart::PersistedCart;
use shared::models::{
    CouponStatus, LedgerEntry, LoyaltyAccount, LoyaltyReward, PromoDefinition, StoreLocation,
    StoredCoupon,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::services::OrderDraft;

/// Saved carts: key = user_id, value = JSON-serialized PersistedCart
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Store locations: key = location_id, value = JSON-serialized StoreLocation
const LOCATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("locations");

/// Promo catalog: key = uppercased code, value = JSON-serialized PromoDefinition
const PROMO_CODES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("promo_codes");

/// Completed order counts: key = user_id, value = count
const USER_ORDERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("user_orders");

/// Loyalty accounts: key = user_id, value = JSON-serialized LoyaltyAccount
const LOYALTY_ACCOUNTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("loyalty_accounts");

/// Reward catalog: key = reward_id, value = JSON-serialized LoyaltyReward
const LOYALTY_REWARDS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("loyalty_rewards");

/// Issued coupons: key = coupon_id, value = JSON-serialized StoredCoupon
const LOYALTY_COUPONS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("loyalty_coupons");

/// Points ledger: key = (user_id, entry_id), value = JSON-serialized LedgerEntry
const LOYALTY_LEDGER_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("loyalty_ledger");

/// Orders waiting for a payment notification: key = order_ref
const PENDING_ORDERS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("pending_orders");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Loyalty account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient points: balance={balance}, required={required}")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("User {0} already holds an active coupon")]
    ActiveCouponExists(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::error::AppError {
    fn from(err: StorageError) -> Self {
        use shared::error::{AppError, ErrorCode};
        match err {
            StorageError::AccountNotFound(user) => {
                AppError::new(ErrorCode::LoyaltyAccountNotFound).with_detail("user_id", user)
            }
            StorageError::InsufficientPoints { balance, required } => {
                AppError::new(ErrorCode::InsufficientPoints)
                    .with_detail("balance", balance)
                    .with_detail("required", required)
            }
            StorageError::ActiveCouponExists(user) => {
                AppError::new(ErrorCode::CouponAlreadyActive).with_detail("user_id", user)
            }
            StorageError::CouponNotFound(id) => {
                AppError::new(ErrorCode::CouponNotFound).with_detail("coupon_id", id)
            }
            other => AppError::database(other.to_string()),
        }
    }
}

/// Storefront storage backed by redb
#[derive(Clone)]
pub struct StorefrontStorage {
    db: Arc<Database>,
}

impl StorefrontStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(db)
    }

    fn init_tables(db: Database) -> StorageResult<Self> {
        // Create all tables up front so readers never hit TableDoesNotExist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(LOCATIONS_TABLE)?;
            let _ = write_txn.open_table(PROMO_CODES_TABLE)?;
            let _ = write_txn.open_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(LOYALTY_ACCOUNTS_TABLE)?;
            let _ = write_txn.open_table(LOYALTY_REWARDS_TABLE)?;
            let _ = write_txn.open_table(LOYALTY_COUPONS_TABLE)?;
            let _ = write_txn.open_table(LOYALTY_LEDGER_TABLE)?;
            let _ = write_txn.open_table(PENDING_ORDERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Cart Persistence ==========

    /// Save the persisted subset of a user's cart
    pub fn save_cart(&self, user_id: &str, cart: &PersistedCart) -> StorageResult<()> {
        let bytes = serde_json::to_vec(cart)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            table.insert(user_id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Load a user's saved cart, if any
    pub fn load_cart(&self, user_id: &str) -> StorageResult<Option<PersistedCart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        match table.get(user_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a user's saved cart
    pub fn delete_cart(&self, user_id: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            table.remove(user_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Locations ==========

    pub fn upsert_location(&self, location: &StoreLocation) -> StorageResult<()> {
        let bytes = serde_json::to_vec(location)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(LOCATIONS_TABLE)?;
            table.insert(location.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_location(&self, id: &str) -> StorageResult<Option<StoreLocation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_locations(&self) -> StorageResult<Vec<StoreLocation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;
        let mut locations = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            locations.push(serde_json::from_slice(value.value())?);
        }
        Ok(locations)
    }

    // ========== Promo Codes ==========

    /// Insert or replace a promo definition. Codes are stored uppercased.
    pub fn upsert_promo(&self, promo: &PromoDefinition) -> StorageResult<()> {
        let key = promo.code.to_uppercase();
        let bytes = serde_json::to_vec(promo)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROMO_CODES_TABLE)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Look up a promo definition. The lookup is case-insensitive.
    pub fn get_promo(&self, code: &str) -> StorageResult<Option<PromoDefinition>> {
        let key = code.to_uppercase();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROMO_CODES_TABLE)?;
        match table.get(key.as_str())? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Bump a promo's usage counter atomically. No-op for unknown codes.
    pub fn increment_promo_usage(&self, code: &str) -> StorageResult<()> {
        let key = code.to_uppercase();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROMO_CODES_TABLE)?;
            let updated = match table.get(key.as_str())? {
                Some(guard) => {
                    let mut promo: PromoDefinition = serde_json::from_slice(guard.value())?;
                    promo.usage_count += 1;
                    Some(serde_json::to_vec(&promo)?)
                }
                None => None,
            };
            if let Some(bytes) = updated {
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Order Counters ==========

    /// Number of completed orders for a user
    pub fn order_count(&self, user_id: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_ORDERS_TABLE)?;
        Ok(table.get(user_id)?.map(|g| g.value()).unwrap_or(0))
    }

    /// Increment and return a user's completed order count
    pub fn increment_order_count(&self, user_id: &str) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(USER_ORDERS_TABLE)?;
            let next = table.get(user_id)?.map(|g| g.value()).unwrap_or(0) + 1;
            table.insert(user_id, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Loyalty Accounts ==========

    pub fn get_account(&self, user_id: &str) -> StorageResult<Option<LoyaltyAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_ACCOUNTS_TABLE)?;
        match table.get(user_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_account(&self, account: &LoyaltyAccount) -> StorageResult<()> {
        let bytes = serde_json::to_vec(account)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(LOYALTY_ACCOUNTS_TABLE)?;
            table.insert(account.user_id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Adjust a user's point balance atomically.
    ///
    /// Fails with [`StorageError::InsufficientPoints`] when the adjustment
    /// would take the balance negative; the balance is left untouched.
    pub fn adjust_points(
        &self,
        user_id: &str,
        delta: i64,
        now_millis: i64,
    ) -> StorageResult<LoyaltyAccount> {
        let txn = self.db.begin_write()?;
        let account = {
            let mut table = txn.open_table(LOYALTY_ACCOUNTS_TABLE)?;
            let mut account: LoyaltyAccount = match table.get(user_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StorageError::AccountNotFound(user_id.to_string())),
            };
            let next = account.points_balance + delta;
            if next < 0 {
                return Err(StorageError::InsufficientPoints {
                    balance: account.points_balance,
                    required: -delta,
                });
            }
            account.points_balance = next;
            account.updated_at = now_millis;
            let bytes = serde_json::to_vec(&account)?;
            table.insert(user_id, bytes.as_slice())?;
            account
        };
        txn.commit()?;
        Ok(account)
    }

    // ========== Loyalty Rewards ==========

    pub fn upsert_reward(&self, reward: &LoyaltyReward) -> StorageResult<()> {
        let bytes = serde_json::to_vec(reward)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(LOYALTY_REWARDS_TABLE)?;
            table.insert(reward.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_reward(&self, id: &str) -> StorageResult<Option<LoyaltyReward>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_REWARDS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_rewards(&self) -> StorageResult<Vec<LoyaltyReward>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_REWARDS_TABLE)?;
        let mut rewards = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            rewards.push(serde_json::from_slice(value.value())?);
        }
        Ok(rewards)
    }

    // ========== Loyalty Coupons ==========

    /// Insert a freshly issued coupon.
    ///
    /// Enforces the one-active-coupon-per-user invariant inside the write
    /// transaction: if the user already holds an active coupon the insert
    /// fails with [`StorageError::ActiveCouponExists`] and nothing is
    /// written.
    pub fn insert_coupon(&self, stored: &StoredCoupon) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(LOYALTY_COUPONS_TABLE)?;
            for entry in table.iter()? {
                let (_, value) = entry?;
                let existing: StoredCoupon = serde_json::from_slice(value.value())?;
                if existing.user_id == stored.user_id && existing.is_active() {
                    return Err(StorageError::ActiveCouponExists(stored.user_id.clone()));
                }
            }
            let bytes = serde_json::to_vec(stored)?;
            table.insert(stored.coupon.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_coupon(&self, id: &str) -> StorageResult<Option<StoredCoupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_COUPONS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// The user's active coupon, if any
    pub fn active_coupon_for_user(&self, user_id: &str) -> StorageResult<Option<StoredCoupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_COUPONS_TABLE)?;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let stored: StoredCoupon = serde_json::from_slice(value.value())?;
            if stored.user_id == user_id && stored.is_active() {
                return Ok(Some(stored));
            }
        }
        Ok(None)
    }

    /// Transition a coupon to the given status
    pub fn set_coupon_status(
        &self,
        coupon_id: &str,
        status: CouponStatus,
        now_millis: i64,
    ) -> StorageResult<StoredCoupon> {
        let txn = self.db.begin_write()?;
        let stored = {
            let mut table = txn.open_table(LOYALTY_COUPONS_TABLE)?;
            let mut stored: StoredCoupon = match table.get(coupon_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StorageError::CouponNotFound(coupon_id.to_string())),
            };
            stored.status = status;
            if status == CouponStatus::Used {
                stored.used_at = Some(now_millis);
            }
            let bytes = serde_json::to_vec(&stored)?;
            table.insert(coupon_id, bytes.as_slice())?;
            stored
        };
        txn.commit()?;
        Ok(stored)
    }

    // ========== Loyalty Ledger ==========

    /// Append a ledger entry for a user's point movement
    pub fn append_ledger(&self, entry: &LedgerEntry) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entry)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(LOYALTY_LEDGER_TABLE)?;
            table.insert((entry.user_id.as_str(), entry.id.as_str()), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// All ledger entries for a user, in key order
    pub fn ledger_for_user(&self, user_id: &str) -> StorageResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOYALTY_LEDGER_TABLE)?;
        let mut entries = Vec::new();
        for entry in table.range((user_id, "")..)? {
            let (key, value) = entry?;
            if key.value().0 != user_id {
                break;
            }
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // ========== Pending Orders ==========

    /// Park an order awaiting a payment notification
    pub fn save_pending_order(&self, draft: &OrderDraft) -> StorageResult<()> {
        let bytes = serde_json::to_vec(draft)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
            table.insert(draft.order_ref.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn take_pending_order(&self, order_ref: &str) -> StorageResult<Option<OrderDraft>> {
        let txn = self.db.begin_write()?;
        let draft = {
            let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
            match table.remove(order_ref)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            }
        };
        txn.commit()?;
        Ok(draft)
    }
}

// ==================== Tests ====================

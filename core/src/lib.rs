//! # aDeal Core
//!
//! Storage, matching, and reward accounting for the aDeal network: a
//! wishlist-driven advertising engine where users declare what they
//! want, advertisers publish ads, and users earn ADEAL tokens for the
//! attention they give.
//!
//! | Component | Operations |
//! |-----------|------------|
//! | Identity  | [`Service::register`], [`Service::identity`], [`Service::update_profile`], [`Service::did_document`] |
//! | Wishlist  | [`Service::add_wishlist_item`], [`Service::remove_wishlist_item`], [`Service::wishlist`] |
//! | Catalog   | [`Service::publish_ad`], [`Service::ad`], [`Service::search_ads`], [`Service::update_reputation`] |
//! | Matching  | [`Service::match_ads`], [`Service::record_view`], [`Service::record_feedback`] |
//! | Ledger    | [`Service::balances`], [`Service::withdraw`], [`Service::history`] |
//!
//! ## Architecture
//!
//! All state lives in SQLite. A single [`Service`] owns the pool, a
//! per-address lock table, and the settlement gateway; every mutation
//! runs inside a transaction while holding the address lock, so
//! concurrent requests for one address serialize and partial writes
//! never land. The operation implementations are split per component
//! across `identity`, `wishlist`, `catalog`, `matching`, and `ledger`.

use std::sync::Arc;

use sqlx::{Sqlite, SqlitePool, Transaction};

pub mod amount;
pub mod db;
pub mod error;
pub mod locks;
pub mod settlement;
pub mod types;

mod catalog;
mod identity;
mod ledger;
mod matching;
mod wishlist;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test;

pub use amount::TokenAmount;
pub use error::{CoreError, ErrorKind, Result};
pub use identity::did_for_address;
pub use matching::FEEDBACK_BONUS;
pub use settlement::{InstantSettlement, SettlementError, SettlementGateway};
pub use types::{
    AdRecord, Balances, DidDocument, FeedbackEvent, FeedbackOutcome, Identity, NewAd, Priority,
    ProfileUpdate, RewardEntry, RewardReason, RewardStatus, WishlistItem, WishlistItemType,
    WithdrawalReceipt,
};

use locks::AddressLocks;

/// Handle to the full engine. Cheap to clone; clones share the pool,
/// the lock table, and the settlement gateway.
#[derive(Clone)]
pub struct Service {
    pool: SqlitePool,
    locks: Arc<AddressLocks>,
    settlement: Arc<dyn SettlementGateway>,
}

impl Service {
    /// Open (or create) the database at `database_url` and run migrations.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = db::init_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Fully in-memory instance, used by tests and demo setups.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = db::init_memory_pool().await?;
        Ok(Self::from_pool(pool))
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Service {
            pool,
            locks: Arc::new(AddressLocks::new()),
            settlement: Arc::new(settlement::InstantSettlement),
        }
    }

    /// Swap in a different settlement gateway.
    pub fn with_settlement(mut self, settlement: Arc<dyn SettlementGateway>) -> Self {
        self.settlement = settlement;
        self
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a mutation transaction. `BEGIN IMMEDIATE` takes the write
    /// lock before the first read, so a read-then-write transaction can
    /// never fail its lock upgrade halfway through (`SQLITE_BUSY_SNAPSHOT`
    /// is not retried by the busy timeout).
    pub(crate) async fn write_tx(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Addresses are opaque caller-supplied strings; they must be non-empty
/// and contain no whitespace.
pub(crate) fn ensure_address(address: &str) -> Result<()> {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidInput(
            "address must be non-empty with no whitespace".into(),
        ));
    }
    Ok(())
}

//! Reward ledger — append-only ADEAL entries, balances, withdrawals.
//!
//! The entry log is the source of truth: balances are sums over it,
//! entries flip `pending -> claimed` only through [`Service::withdraw`],
//! and nothing is ever deleted.

use sqlx::SqliteConnection;
use tracing::info;

use crate::amount::TokenAmount;
use crate::error::{CoreError, Result};
use crate::types::{Balances, RewardEntry, RewardReason, RewardStatus, WithdrawalReceipt};
use crate::{ensure_address, now_ms, Service};

pub(crate) const ENTRY_COLUMNS: &str =
    "id, address, amount, reason, source_ad_id, memo, status, created_at";

impl Service {
    /// Sum of `pending` entries for `address`. Zero when unknown.
    pub async fn pending_balance(&self, address: &str) -> Result<TokenAmount> {
        self.balance_of(address, RewardStatus::Pending).await
    }

    /// Sum of `claimed` entries for `address`. Zero when unknown.
    pub async fn claimed_balance(&self, address: &str) -> Result<TokenAmount> {
        self.balance_of(address, RewardStatus::Claimed).await
    }

    /// Both balances in one shot.
    pub async fn balances(&self, address: &str) -> Result<Balances> {
        Ok(Balances {
            pending: self.pending_balance(address).await?,
            claimed: self.claimed_balance(address).await?,
        })
    }

    async fn balance_of(&self, address: &str, status: RewardStatus) -> Result<TokenAmount> {
        ensure_address(address)?;
        let milli: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM reward_entries WHERE address = ?1 AND status = ?2",
        )
        .bind(address)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(TokenAmount::from_milli(milli))
    }

    /// Claim every pending entry for `address` in one settlement.
    ///
    /// Snapshots the pending entries, awaits the settlement gateway,
    /// and flips exactly the snapshotted entries to `claimed`. A
    /// gateway failure aborts the transaction: every entry stays
    /// pending. Entries credited after the snapshot are untouched and
    /// wait for the next withdrawal. The transaction holds the write
    /// lock across the settlement call, so other mutations queue
    /// behind an in-flight withdrawal instead of failing it.
    pub async fn withdraw(&self, address: &str) -> Result<WithdrawalReceipt> {
        ensure_address(address)?;
        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let mut tx = self.write_tx().await?;
        let mut entries = sqlx::query_as::<_, RewardEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM   reward_entries
            WHERE  address = ?1 AND status = 'pending'
            ORDER  BY id ASC
            "#
        ))
        .bind(address)
        .fetch_all(&mut *tx)
        .await?;

        if entries.is_empty() {
            return Err(CoreError::NothingToWithdraw(address.to_string()));
        }

        let mut total = TokenAmount::ZERO;
        let mut last_id = 0i64;
        for entry in &entries {
            total = total.checked_add(entry.amount).ok_or_else(|| {
                CoreError::Internal("pending balance exceeds the token range".into())
            })?;
            last_id = entry.id;
        }

        self.settlement.settle(address, total).await?;

        let flipped = sqlx::query(
            r#"
            UPDATE reward_entries
            SET    status = 'claimed'
            WHERE  address = ?1 AND status = 'pending' AND id <= ?2
            "#,
        )
        .bind(address)
        .bind(last_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // The address lock rules out concurrent credits, so the flip
        // must cover exactly the snapshot.
        if flipped != entries.len() as u64 {
            return Err(CoreError::Internal(format!(
                "withdrawal flipped {flipped} entries, snapshot had {}",
                entries.len()
            )));
        }
        tx.commit().await?;

        for entry in &mut entries {
            entry.status = RewardStatus::Claimed;
        }
        info!(%address, amount = %total, entries = entries.len(), "withdrawal settled");

        Ok(WithdrawalReceipt {
            address: address.to_string(),
            amount_claimed: total,
            entries,
        })
    }

    /// Full reward history for `address`, newest first.
    pub async fn history(&self, address: &str) -> Result<Vec<RewardEntry>> {
        ensure_address(address)?;
        let rows = sqlx::query_as::<_, RewardEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM   reward_entries
            WHERE  address = ?1
            ORDER  BY created_at DESC, id DESC
            "#
        ))
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Append one pending entry inside the caller's transaction.
pub(crate) async fn credit_reward(
    tx: &mut SqliteConnection,
    address: &str,
    amount: TokenAmount,
    reason: RewardReason,
    source_ad_id: &str,
    memo: &str,
) -> Result<RewardEntry> {
    let now = now_ms();
    let id = sqlx::query(
        r#"
        INSERT INTO reward_entries
            (address, amount, reason, source_ad_id, memo, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)
        "#,
    )
    .bind(address)
    .bind(amount)
    .bind(reason)
    .bind(source_ad_id)
    .bind(memo)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    Ok(RewardEntry {
        id,
        address: address.to_string(),
        amount,
        reason,
        source_ad_id: source_ad_id.to_string(),
        memo: memo.to_string(),
        status: RewardStatus::Pending,
        created_at: now,
    })
}

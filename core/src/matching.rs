//! Matching engine — wishlist-driven ad selection, views, and feedback.
//!
//! Matching is deterministic: candidates are collected per wishlist
//! item, unioned keeping the highest matching priority, filtered
//! against exclusions, and ranked by a fixed comparator. No randomness
//! anywhere.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::amount::TokenAmount;
use crate::catalog::AD_COLUMNS;
use crate::error::{CoreError, Result};
use crate::ledger::{credit_reward, ENTRY_COLUMNS};
use crate::types::{
    AdRecord, FeedbackOutcome, Priority, RewardEntry, RewardReason, WishlistItem, WishlistItemType,
};
use crate::{ensure_address, now_ms, Service};

/// Flat bonus credited for positive ad feedback: 0.020 ADEAL.
pub const FEEDBACK_BONUS: TokenAmount = TokenAmount::from_milli(20);

/// An ad that matched at least one wishlist item, tagged with the
/// highest priority among the items it matched and its catalog
/// insertion rank.
struct RankedCandidate {
    priority: Priority,
    seq: i64,
    ad: AdRecord,
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    seq: i64,
    #[sqlx(flatten)]
    ad: AdRecord,
}

impl Service {
    /// Select the ads to serve `address`, best match first.
    ///
    /// An empty wishlist yields an empty result; matching never invents
    /// ads the wishlist does not justify. Permanently excluded are ads
    /// the address gave negative feedback on and ads already credited
    /// with a view; `exclude` carries the ad ids the caller currently
    /// has on screen.
    pub async fn match_ads(
        &self,
        address: &str,
        max_results: Option<usize>,
        exclude: &[String],
    ) -> Result<Vec<AdRecord>> {
        ensure_address(address)?;
        let limit = max_results.unwrap_or(10).min(50);

        let items = self.wishlist(address).await?;
        if items.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut excluded: HashSet<String> = exclude.iter().cloned().collect();
        let negative: Vec<String> = sqlx::query_scalar(
            "SELECT ad_id FROM feedback_events WHERE address = ?1 AND outcome = 'negative'",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        excluded.extend(negative);
        let viewed: Vec<String> = sqlx::query_scalar(
            "SELECT source_ad_id FROM reward_entries WHERE address = ?1 AND reason = 'ad_view'",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        excluded.extend(viewed);

        let mut best: HashMap<String, RankedCandidate> = HashMap::new();
        for item in &items {
            for row in self.wishlist_candidates(item).await? {
                if excluded.contains(&row.ad.id) {
                    continue;
                }
                match best.get_mut(&row.ad.id) {
                    Some(existing) => {
                        if item.priority > existing.priority {
                            existing.priority = item.priority;
                        }
                    }
                    None => {
                        best.insert(
                            row.ad.id.clone(),
                            RankedCandidate {
                                priority: item.priority,
                                seq: row.seq,
                                ad: row.ad,
                            },
                        );
                    }
                }
            }
        }

        let mut ranked: Vec<RankedCandidate> = best.into_values().collect();
        ranked.sort_by(rank);
        ranked.truncate(limit);
        Ok(ranked.into_iter().map(|candidate| candidate.ad).collect())
    }

    /// Candidate ads for one wishlist item: substring match of the item
    /// content, folding ASCII case only (to agree with SQLite's
    /// `lower()`). `category` items match the ad's category field only;
    /// every other type also matches title and description.
    async fn wishlist_candidates(&self, item: &WishlistItem) -> Result<Vec<CandidateRow>> {
        let needle = item.content.to_ascii_lowercase();
        let sql = match item.item_type {
            WishlistItemType::Category => format!(
                "SELECT rowid AS seq, {AD_COLUMNS} FROM ads WHERE instr(lower(category), ?1) > 0"
            ),
            _ => format!(
                "SELECT rowid AS seq, {AD_COLUMNS} FROM ads \
                 WHERE instr(lower(title), ?1) > 0 \
                    OR instr(lower(description), ?1) > 0 \
                    OR instr(lower(category), ?1) > 0"
            ),
        };
        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(&needle)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Credit the viewer reward for `address` watching `ad_id`.
    ///
    /// At most one view entry ever exists per (address, ad): a repeat
    /// call returns the existing entry unchanged. Ads with a zero
    /// reward credit nothing and return `None`.
    pub async fn record_view(&self, address: &str, ad_id: &str) -> Result<Option<RewardEntry>> {
        ensure_address(address)?;
        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let mut tx = self.write_tx().await?;
        let ad = match fetch_ad(&mut tx, ad_id).await? {
            Some(ad) => ad,
            None => return Err(CoreError::NotFound(format!("ad {ad_id}"))),
        };
        if ad.reward_amount.is_zero() {
            return Ok(None);
        }

        let existing = sqlx::query_as::<_, RewardEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM   reward_entries
            WHERE  address = ?1 AND source_ad_id = ?2 AND reason = 'ad_view'
            "#
        ))
        .bind(address)
        .bind(ad_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(entry) = existing {
            return Ok(Some(entry));
        }

        let memo = format!("Ad view reward - {}", ad.title);
        let entry = credit_reward(
            &mut tx,
            address,
            ad.reward_amount,
            RewardReason::AdView,
            ad_id,
            &memo,
        )
        .await?;
        tx.commit().await?;
        Ok(Some(entry))
    }

    /// Record `address`'s verdict on `ad_id`.
    ///
    /// One verdict per (address, ad), never overwritten. Positive
    /// feedback credits [`FEEDBACK_BONUS`]; negative feedback credits
    /// nothing and permanently drops the ad from this address's
    /// matches.
    pub async fn record_feedback(
        &self,
        address: &str,
        ad_id: &str,
        outcome: FeedbackOutcome,
    ) -> Result<Option<RewardEntry>> {
        ensure_address(address)?;
        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let mut tx = self.write_tx().await?;
        let ad = match fetch_ad(&mut tx, ad_id).await? {
            Some(ad) => ad,
            None => return Err(CoreError::NotFound(format!("ad {ad_id}"))),
        };

        let recorded = sqlx::query(
            r#"
            INSERT OR IGNORE INTO feedback_events (address, ad_id, outcome, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(address)
        .bind(ad_id)
        .bind(outcome)
        .bind(now_ms())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if recorded == 0 {
            return Err(CoreError::Conflict(format!(
                "feedback for ad {ad_id} already recorded"
            )));
        }

        let entry = match outcome {
            FeedbackOutcome::Positive => {
                let memo = format!("Positive feedback reward - {}", ad.title);
                Some(
                    credit_reward(
                        &mut tx,
                        address,
                        FEEDBACK_BONUS,
                        RewardReason::FeedbackBonus,
                        ad_id,
                        &memo,
                    )
                    .await?,
                )
            }
            FeedbackOutcome::Negative => None,
        };
        tx.commit().await?;
        Ok(entry)
    }
}

async fn fetch_ad(tx: &mut sqlx::SqliteConnection, ad_id: &str) -> Result<Option<AdRecord>> {
    let ad = sqlx::query_as::<_, AdRecord>(&format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"))
        .bind(ad_id)
        .fetch_optional(&mut *tx)
        .await?;
    Ok(ad)
}

/// Fixed match ordering: wishlist priority, advertiser reputation, and
/// reward amount all descending, catalog insertion order as the final
/// tiebreak.
fn rank(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| {
            b.ad.advertiser_reputation
                .partial_cmp(&a.ad.advertiser_reputation)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.ad.reward_amount.cmp(&a.ad.reward_amount))
        .then_with(|| a.seq.cmp(&b.seq))
}

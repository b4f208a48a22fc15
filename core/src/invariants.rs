#![allow(dead_code)]

//! Ledger invariant checks shared by the scenario tests.

use std::collections::HashSet;

use crate::amount::TokenAmount;
use crate::types::RewardStatus;
use crate::Service;

/// INV-1: Every ledger entry carries a positive amount, and
/// INV-2: both balances equal the sums over the entry log.
pub async fn assert_ledger_conserved(service: &Service, address: &str) {
    let history = service.history(address).await.expect("history");
    let mut pending = 0i64;
    let mut claimed = 0i64;
    for entry in &history {
        assert!(
            entry.amount.as_milli() > 0,
            "INV-1 violated: entry {} has non-positive amount {}",
            entry.id,
            entry.amount
        );
        match entry.status {
            RewardStatus::Pending => pending += entry.amount.as_milli(),
            RewardStatus::Claimed => claimed += entry.amount.as_milli(),
        }
    }

    let balances = service.balances(address).await.expect("balances");
    assert_eq!(
        balances.pending.as_milli(),
        pending,
        "INV-2 violated: pending balance disagrees with the entry log for {address}"
    );
    assert_eq!(
        balances.claimed.as_milli(),
        claimed,
        "INV-2 violated: claimed balance disagrees with the entry log for {address}"
    );
}

/// INV-3: At most one entry per (address, ad, reason) — one view credit
/// and one feedback bonus per ad, ever.
pub async fn assert_rewards_unique_per_ad(service: &Service, address: &str) {
    let history = service.history(address).await.expect("history");
    let mut seen = HashSet::new();
    for entry in &history {
        assert!(
            seen.insert((entry.source_ad_id.clone(), entry.reason)),
            "INV-3 violated: duplicate {:?} entry for ad {} and {address}",
            entry.reason,
            entry.source_ad_id
        );
    }
}

/// INV-4: Claimed balance never decreases.
pub fn assert_claimed_monotonic(before: TokenAmount, after: TokenAmount) {
    assert!(
        after >= before,
        "INV-4 violated: claimed balance decreased from {before} to {after}"
    );
}

/// INV-5: The entry log is append-only; history never shrinks.
pub fn assert_history_append_only(before: usize, after: usize) {
    assert!(
        after >= before,
        "INV-5 violated: history shrank from {before} to {after} entries"
    );
}

/// Run every per-address ledger invariant.
pub async fn assert_all_ledger_invariants(service: &Service, address: &str) {
    assert_ledger_conserved(service, address).await;
    assert_rewards_unique_per_ad(service, address).await;
}

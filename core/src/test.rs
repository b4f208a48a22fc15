//! End-to-end scenarios across identity, wishlist, matching, and ledger.

use std::sync::Arc;
use std::time::Duration;

use crate::amount::TokenAmount;
use crate::error::CoreError;
use crate::invariants::{
    assert_all_ledger_invariants, assert_claimed_monotonic, assert_history_append_only,
};
use crate::settlement::{SettlementError, SettlementGateway};
use crate::types::{FeedbackOutcome, NewAd, Priority, RewardReason, RewardStatus, WishlistItemType};
use crate::Service;

fn running_shoes_ad() -> NewAd {
    NewAd {
        id: "1".into(),
        title: "Premium Running Shoes".into(),
        description:
            "Get 20% off on the latest collection of running shoes. Perfect for your fitness goals!"
                .into(),
        image_url: Some(
            "https://via.placeholder.com/300x200/4F46E5/FFFFFF?text=Running+Shoes".into(),
        ),
        advertiser: "SportCo".into(),
        advertiser_reputation: 4.8,
        reward_amount: TokenAmount::from_milli(50),
        category: "Sports & Fitness".into(),
        is_sponsored: true,
    }
}

fn coffee_ad() -> NewAd {
    NewAd {
        id: "2".into(),
        title: "Organic Coffee Beans".into(),
        description:
            "Single-origin coffee beans from Ethiopia. Freshly roasted and delivered to your door."
                .into(),
        image_url: Some(
            "https://via.placeholder.com/300x200/059669/FFFFFF?text=Coffee+Beans".into(),
        ),
        advertiser: "BeanMaster".into(),
        advertiser_reputation: 4.6,
        reward_amount: TokenAmount::from_milli(30),
        category: "Food & Beverage".into(),
        is_sponsored: true,
    }
}

async fn setup() -> Service {
    let service = Service::open_in_memory().await.expect("in-memory service");
    service
        .publish_ad(running_shoes_ad())
        .await
        .expect("publish shoes ad");
    service
        .publish_ad(coffee_ad())
        .await
        .expect("publish coffee ad");
    service
}

struct FailingSettlement;

#[async_trait::async_trait]
impl SettlementGateway for FailingSettlement {
    async fn settle(&self, _address: &str, _amount: TokenAmount) -> Result<(), SettlementError> {
        Err(SettlementError("chain unavailable".into()))
    }
}

struct SlowSettlement;

#[async_trait::async_trait]
impl SettlementGateway for SlowSettlement {
    async fn settle(&self, _address: &str, _amount: TokenAmount) -> Result<(), SettlementError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_full_reward_cycle_for_a_wallet() {
    let service = setup().await;

    let identity = service.register("0xABC", "alice", None).await.unwrap();
    assert_eq!(identity.did, "did:adeal:0xABC");
    assert_eq!(identity.username, "alice");

    service
        .add_wishlist_item(
            "0xABC",
            WishlistItemType::Keyword,
            "running shoes",
            Priority::High,
        )
        .await
        .unwrap();

    let matches = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "1");
    assert_eq!(matches[0].title, "Premium Running Shoes");

    let entry = service.record_view("0xABC", "1").await.unwrap().unwrap();
    assert_eq!(entry.amount, TokenAmount::from_milli(50));
    assert_eq!(entry.reason, RewardReason::AdView);
    assert_eq!(entry.status, RewardStatus::Pending);
    assert_eq!(entry.memo, "Ad view reward - Premium Running Shoes");

    let balances = service.balances("0xABC").await.unwrap();
    assert_eq!(balances.pending, TokenAmount::from_milli(50));
    assert_eq!(balances.claimed, TokenAmount::ZERO);

    let receipt = service.withdraw("0xABC").await.unwrap();
    assert_eq!(receipt.amount_claimed, TokenAmount::from_milli(50));
    assert_eq!(receipt.entries.len(), 1);
    assert_eq!(receipt.entries[0].status, RewardStatus::Claimed);

    let balances = service.balances("0xABC").await.unwrap();
    assert_eq!(balances.pending, TokenAmount::ZERO);
    assert_eq!(balances.claimed, TokenAmount::from_milli(50));

    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_viewed_ads_leave_the_match_pool() {
    let service = setup().await;
    service
        .add_wishlist_item(
            "0xABC",
            WishlistItemType::Keyword,
            "running shoes",
            Priority::High,
        )
        .await
        .unwrap();

    assert_eq!(service.match_ads("0xABC", None, &[]).await.unwrap().len(), 1);
    service.record_view("0xABC", "1").await.unwrap();
    assert!(service.match_ads("0xABC", None, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeat_view_returns_the_existing_entry() {
    let service = setup().await;

    let first = service.record_view("0xABC", "1").await.unwrap().unwrap();
    let second = service.record_view("0xABC", "1").await.unwrap().unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);

    assert_eq!(service.history("0xABC").await.unwrap().len(), 1);
    assert_eq!(
        service.pending_balance("0xABC").await.unwrap(),
        TokenAmount::from_milli(50)
    );
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_positive_feedback_credits_the_bonus() {
    let service = setup().await;

    let entry = service
        .record_feedback("0xABC", "1", FeedbackOutcome::Positive)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.amount, crate::FEEDBACK_BONUS);
    assert_eq!(entry.reason, RewardReason::FeedbackBonus);
    assert_eq!(entry.memo, "Positive feedback reward - Premium Running Shoes");

    // One verdict per ad, ever.
    let err = service
        .record_feedback("0xABC", "1", FeedbackOutcome::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    assert_eq!(
        service.pending_balance("0xABC").await.unwrap(),
        TokenAmount::from_milli(20)
    );
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_negative_feedback_permanently_excludes() {
    let service = setup().await;
    service
        .add_wishlist_item(
            "0xABC",
            WishlistItemType::Keyword,
            "running shoes",
            Priority::High,
        )
        .await
        .unwrap();
    service
        .add_wishlist_item("0xABC", WishlistItemType::Keyword, "coffee", Priority::Medium)
        .await
        .unwrap();

    let before = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(before.len(), 2);
    assert_eq!(before[0].id, "1");

    let entry = service
        .record_feedback("0xABC", "1", FeedbackOutcome::Negative)
        .await
        .unwrap();
    assert!(entry.is_none());

    let after = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, "2");

    // Flipping the verdict later is rejected; the exclusion stands.
    let err = service
        .record_feedback("0xABC", "1", FeedbackOutcome::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert!(service.history("0xABC").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_matching_ranks_priority_over_reputation() {
    let service = setup().await;

    // Coffee is wanted more than shoes, despite SportCo's reputation.
    service
        .add_wishlist_item("0xABC", WishlistItemType::Keyword, "coffee", Priority::High)
        .await
        .unwrap();
    service
        .add_wishlist_item(
            "0xABC",
            WishlistItemType::Keyword,
            "running shoes",
            Priority::Low,
        )
        .await
        .unwrap();

    let matches = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "2");
    assert_eq!(matches[1].id, "1");

    // The on-screen exclusion set drops ads without touching state.
    let excluded = service
        .match_ads("0xABC", None, &["2".to_string()])
        .await
        .unwrap();
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].id, "1");

    let capped = service.match_ads("0xABC", Some(1), &[]).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, "2");
}

#[tokio::test]
async fn test_category_items_match_the_category_field_only() {
    let service = setup().await;

    // "coffee" appears in ad 2's title but not in any category.
    service
        .add_wishlist_item("0xABC", WishlistItemType::Category, "coffee", Priority::High)
        .await
        .unwrap();
    assert!(service.match_ads("0xABC", None, &[]).await.unwrap().is_empty());

    service
        .add_wishlist_item(
            "0xDEF",
            WishlistItemType::Category,
            "food & beverage",
            Priority::High,
        )
        .await
        .unwrap();
    let matches = service.match_ads("0xDEF", None, &[]).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "2");
}

#[tokio::test]
async fn test_matching_folds_ascii_case_only() {
    let service = setup().await;
    let mut cafe_ad = running_shoes_ad();
    cafe_ad.id = "3".into();
    cafe_ad.title = "CAFÉ Subscription Box".into();
    service.publish_ad(cafe_ad).await.unwrap();

    // ASCII letters fold; the accented É must match byte-for-byte.
    service
        .add_wishlist_item("0xABC", WishlistItemType::Keyword, "CAFÉ", Priority::High)
        .await
        .unwrap();
    let matches = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "3");

    service
        .add_wishlist_item("0xDEF", WishlistItemType::Keyword, "café", Priority::High)
        .await
        .unwrap();
    assert!(service.match_ads("0xDEF", None, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_reward_ads_credit_nothing() {
    let service = setup().await;
    let mut free_ad = running_shoes_ad();
    free_ad.id = "3".into();
    free_ad.title = "Community Fun Run".into();
    free_ad.reward_amount = TokenAmount::ZERO;
    free_ad.is_sponsored = false;
    service.publish_ad(free_ad).await.unwrap();

    assert!(service.record_view("0xABC", "3").await.unwrap().is_none());
    assert!(service.history("0xABC").await.unwrap().is_empty());

    // Never credited, so it stays in the match pool.
    service
        .add_wishlist_item("0xABC", WishlistItemType::Keyword, "fun run", Priority::Low)
        .await
        .unwrap();
    let matches = service.match_ads("0xABC", None, &[]).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "3");
}

#[tokio::test]
async fn test_settlement_failure_leaves_entries_pending() {
    let service = setup().await;
    service.record_view("0xABC", "1").await.unwrap();

    let flaky = service.clone().with_settlement(Arc::new(FailingSettlement));
    let err = flaky.withdraw("0xABC").await.unwrap_err();
    assert!(matches!(err, CoreError::Settlement(_)));

    // Nothing moved: the same entries settle once the gateway recovers.
    let balances = service.balances("0xABC").await.unwrap();
    assert_eq!(balances.pending, TokenAmount::from_milli(50));
    assert_eq!(balances.claimed, TokenAmount::ZERO);
    assert_eq!(
        service.history("0xABC").await.unwrap()[0].status,
        RewardStatus::Pending
    );

    let receipt = service.withdraw("0xABC").await.unwrap();
    assert_eq!(receipt.amount_claimed, TokenAmount::from_milli(50));
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_later_credits_wait_for_the_next_withdrawal() {
    let service = setup().await;

    service.record_view("0xABC", "1").await.unwrap();
    let claimed_before = service.claimed_balance("0xABC").await.unwrap();
    let history_before = service.history("0xABC").await.unwrap().len();

    let first = service.withdraw("0xABC").await.unwrap();
    assert_eq!(first.amount_claimed, TokenAmount::from_milli(50));

    service.record_view("0xABC", "2").await.unwrap();
    let second = service.withdraw("0xABC").await.unwrap();
    assert_eq!(second.amount_claimed, TokenAmount::from_milli(30));
    assert_eq!(second.entries.len(), 1);
    assert_eq!(second.entries[0].source_ad_id, "2");

    let claimed_after = service.claimed_balance("0xABC").await.unwrap();
    assert_claimed_monotonic(claimed_before, claimed_after);
    assert_eq!(claimed_after, TokenAmount::from_milli(80));
    assert_history_append_only(history_before, service.history("0xABC").await.unwrap().len());
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_second_withdrawal_without_new_credits_fails() {
    let service = setup().await;
    service.record_view("0xABC", "1").await.unwrap();
    service.withdraw("0xABC").await.unwrap();

    let err = service.withdraw("0xABC").await.unwrap_err();
    assert!(matches!(err, CoreError::NothingToWithdraw(_)));

    // The failed call moved nothing.
    let balances = service.balances("0xABC").await.unwrap();
    assert_eq!(balances.pending, TokenAmount::ZERO);
    assert_eq!(balances.claimed, TokenAmount::from_milli(50));
    assert_eq!(service.history("0xABC").await.unwrap().len(), 1);
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_concurrent_views_credit_once() {
    let service = setup().await;

    let a = service.clone();
    let b = service.clone();
    let (first, second) = tokio::join!(
        a.record_view("0xABC", "1"),
        b.record_view("0xABC", "1")
    );
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();
    assert_eq!(first.id, second.id);

    assert_eq!(service.history("0xABC").await.unwrap().len(), 1);
    assert_eq!(
        service.pending_balance("0xABC").await.unwrap(),
        TokenAmount::from_milli(50)
    );
    assert_all_ledger_invariants(&service, "0xABC").await;
}

#[tokio::test]
async fn test_withdrawal_survives_parallel_credits_to_other_wallets() {
    // File-backed pool: multiple connections, like production.
    let path = std::env::temp_dir().join(format!("adeal-parallel-{}.db", std::process::id()));
    let wipe = |path: &std::path::Path| {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    };
    wipe(&path);

    let service = Service::open(&format!("sqlite:{}", path.display()))
        .await
        .unwrap()
        .with_settlement(Arc::new(SlowSettlement));
    service.publish_ad(running_shoes_ad()).await.unwrap();
    service.publish_ad(coffee_ad()).await.unwrap();
    service.record_view("0xABC", "1").await.unwrap();

    // Another wallet earns a credit while 0xABC's settlement is in
    // flight; both operations must land.
    let withdrawing = service.clone();
    let withdrawal = tokio::spawn(async move { withdrawing.withdraw("0xABC").await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    service.record_view("0xDEF", "2").await.unwrap();

    let receipt = withdrawal.await.unwrap().unwrap();
    assert_eq!(receipt.amount_claimed, TokenAmount::from_milli(50));
    assert_eq!(
        service.pending_balance("0xDEF").await.unwrap(),
        TokenAmount::from_milli(30)
    );
    assert_all_ledger_invariants(&service, "0xABC").await;
    assert_all_ledger_invariants(&service, "0xDEF").await;

    wipe(&path);
}

#[tokio::test]
async fn test_unknown_ads_are_not_found() {
    let service = setup().await;
    assert!(matches!(
        service.record_view("0xABC", "404").await.unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(matches!(
        service
            .record_feedback("0xABC", "404", FeedbackOutcome::Positive)
            .await
            .unwrap_err(),
        CoreError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_empty_wishlist_matches_nothing() {
    let service = setup().await;
    assert!(service.match_ads("0xABC", None, &[]).await.unwrap().is_empty());
}

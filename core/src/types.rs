//! Canonical record types for identities, wishlists, ads, and rewards.
//!
//! These are the shapes persisted in SQLite and served over the REST
//! API. Wire JSON uses camelCase field names; database columns use
//! snake_case.

use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;

// ─────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────

/// What kind of thing a wishlist entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WishlistItemType {
    Keyword,
    Product,
    Service,
    Category,
}

/// User-assigned interest level. Ordering is `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FeedbackOutcome {
    Positive,
    Negative,
}

/// Why a reward entry was credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "snake_case")]
pub enum RewardReason {
    AdView,
    FeedbackBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Claimed,
}

// ─────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────

/// A registered user profile, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub address: String,
    pub did: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A single wishlist entry owned by one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: i64,
    pub address: String,
    #[serde(rename = "type")]
    pub item_type: WishlistItemType,
    pub content: String,
    pub priority: Priority,
    pub created_at: i64,
}

/// A published advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub advertiser: String,
    pub advertiser_reputation: f64,
    pub reward_amount: TokenAmount,
    pub category: String,
    pub is_sponsored: bool,
    pub published_at: i64,
}

/// One user's recorded reaction to one ad. At most one per (address, ad).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub address: String,
    pub ad_id: String,
    pub outcome: FeedbackOutcome,
    pub created_at: i64,
}

/// An append-only ledger row. Entries are credited as `pending` and flip
/// to `claimed` on withdrawal; they are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardEntry {
    pub id: i64,
    pub address: String,
    pub amount: TokenAmount,
    pub reason: RewardReason,
    pub source_ad_id: String,
    pub memo: String,
    pub status: RewardStatus,
    pub created_at: i64,
}

/// Pending and claimed totals for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub pending: TokenAmount,
    pub claimed: TokenAmount,
}

/// Result of a successful withdrawal: the total moved to `claimed` and
/// the entries it covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReceipt {
    pub address: String,
    pub amount_claimed: TokenAmount,
    pub entries: Vec<RewardEntry>,
}

// ─────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────

/// Payload for publishing an ad. The publisher supplies the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAd {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub advertiser: String,
    pub advertiser_reputation: f64,
    pub reward_amount: TokenAmount,
    pub category: String,
    #[serde(default)]
    pub is_sponsored: bool,
}

/// Partial profile update. `None` fields are left unchanged; an empty
/// `avatarUrl` string clears the stored avatar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

// ─────────────────────────────────────────────────────────
// DID document
// ─────────────────────────────────────────────────────────

/// W3C-shaped DID document derived from a stored identity.
#[derive(Debug, Clone, Serialize)]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    pub controller: String,
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,
    pub service: Vec<DidService>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: &'static str,
    pub controller: String,
    #[serde(rename = "publicKeyHex")]
    pub public_key_hex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DidService {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: &'static str,
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: ProfileEndpoint,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEndpoint {
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

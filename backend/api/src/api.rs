//! Axum REST API handlers.

use std::sync::Arc;

use adeal_core::{
    AdRecord, Balances, DidDocument, FeedbackOutcome, Identity, NewAd, Priority, ProfileUpdate,
    RewardEntry, Service, TokenAmount, WishlistItem, WishlistItemType, WithdrawalReceipt,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Clone)]
pub struct ApiState {
    pub service: Service,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub address: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub caller: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWishlistRequest {
    pub address: String,
    #[serde(rename = "type")]
    pub item_type: WishlistItemType,
    pub content: String,
    pub priority: Priority,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWishlistRequest {
    pub address: String,
    pub item_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    pub address: String,
    pub ad_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub address: String,
    pub ad_id: String,
    pub outcome: FeedbackOutcome,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRequest {
    pub score: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    pub max_results: Option<usize>,
    /// Comma-separated ad ids already on screen.
    pub exclude: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct WishlistResponse {
    pub address: String,
    pub count: usize,
    pub items: Vec<WishlistItem>,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub address: String,
    pub count: usize,
    pub ads: Vec<AdRecord>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub ads: Vec<AdRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    pub pending: TokenAmount,
    pub claimed: TokenAmount,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub address: String,
    pub count: usize,
    pub entries: Vec<RewardEntry>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Identity handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /identity`
///
/// Registers a wallet address and mints its DID.
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let identity = state
        .service
        .register(&req.address, &req.username, req.avatar_url.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(identity)))
}

/// `GET /identity/:address`
///
/// Returns the registered identity, or `null` when the address has
/// never registered.
pub async fn get_identity(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<Option<Identity>>> {
    Ok(Json(state.service.identity(&address).await?))
}

/// `PUT /identity/:address`
pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Identity>> {
    let update = ProfileUpdate {
        username: req.username,
        avatar_url: req.avatar_url,
    };
    let identity = state
        .service
        .update_profile(&address, &req.caller, update)
        .await?;
    Ok(Json(identity))
}

/// `GET /identity/:address/did.json`
pub async fn did_document(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<DidDocument>> {
    Ok(Json(state.service.did_document(&address).await?))
}

// ─────────────────────────────────────────────────────────
// Wishlist handlers
// ─────────────────────────────────────────────────────────

/// `POST /wishlist`
pub async fn add_wishlist_item(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<AddWishlistRequest>,
) -> Result<impl IntoResponse> {
    let item = state
        .service
        .add_wishlist_item(&req.address, req.item_type, &req.content, req.priority)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `POST /wishlist/remove`
pub async fn remove_wishlist_item(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<RemoveWishlistRequest>,
) -> Result<impl IntoResponse> {
    state
        .service
        .remove_wishlist_item(&req.address, req.item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /wishlist/:address`
pub async fn get_wishlist(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<WishlistResponse>> {
    let items = state.service.wishlist(&address).await?;
    Ok(Json(WishlistResponse {
        address,
        count: items.len(),
        items,
    }))
}

// ─────────────────────────────────────────────────────────
// Catalog handlers
// ─────────────────────────────────────────────────────────

/// `POST /ads`
pub async fn publish_ad(
    State(state): State<Arc<ApiState>>,
    Json(ad): Json<NewAd>,
) -> Result<impl IntoResponse> {
    let published = state.service.publish_ad(ad).await?;
    Ok((StatusCode::CREATED, Json(published)))
}

/// `GET /ads/search?q=&limit=`
pub async fn search_ads(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let q = query.q.unwrap_or_default();
    let ads = state.service.search_ads(&q, query.limit).await?;
    Ok(Json(SearchResponse {
        query: q,
        count: ads.len(),
        ads,
    }))
}

/// `PUT /ads/:id/reputation`
pub async fn update_reputation(
    State(state): State<Arc<ApiState>>,
    Path(ad_id): Path<String>,
    Json(req): Json<ReputationRequest>,
) -> Result<Json<AdRecord>> {
    Ok(Json(state.service.update_reputation(&ad_id, req.score).await?))
}

// ─────────────────────────────────────────────────────────
// Matching handlers
// ─────────────────────────────────────────────────────────

/// `GET /ads/match/:address?maxResults=&exclude=id,id`
///
/// The ads to serve this address right now, best match first.
pub async fn match_ads(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
    Query(query): Query<MatchQuery>,
) -> Result<Json<MatchResponse>> {
    let exclude = parse_exclude(query.exclude.as_deref());
    let ads = state
        .service
        .match_ads(&address, query.max_results, &exclude)
        .await?;
    Ok(Json(MatchResponse {
        address,
        count: ads.len(),
        ads,
    }))
}

/// `POST /ads/view`
///
/// Credits the viewer reward; `null` when the ad carries no reward.
pub async fn record_view(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ViewRequest>,
) -> Result<Json<Option<RewardEntry>>> {
    Ok(Json(state.service.record_view(&req.address, &req.ad_id).await?))
}

/// `POST /ads/feedback`
///
/// Records the verdict; the feedback bonus entry for positive outcomes,
/// `null` for negative ones.
pub async fn record_feedback(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<Option<RewardEntry>>> {
    Ok(Json(
        state
            .service
            .record_feedback(&req.address, &req.ad_id, req.outcome)
            .await?,
    ))
}

// ─────────────────────────────────────────────────────────
// Reward handlers
// ─────────────────────────────────────────────────────────

/// `GET /rewards/:address/balance`
pub async fn get_balance(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>> {
    let Balances { pending, claimed } = state.service.balances(&address).await?;
    Ok(Json(BalanceResponse {
        address,
        pending,
        claimed,
    }))
}

/// `POST /rewards/withdraw`
pub async fn withdraw(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawalReceipt>> {
    Ok(Json(state.service.withdraw(&req.address).await?))
}

/// `GET /rewards/:address/history`
pub async fn get_history(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> Result<Json<HistoryResponse>> {
    let entries = state.service.history(&address).await?;
    Ok(Json(HistoryResponse {
        address,
        count: entries.len(),
        entries,
    }))
}

fn parse_exclude(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

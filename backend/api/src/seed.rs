//! Demo catalog published at startup when `SEED_DEMO` is set.

use adeal_core::{CoreError, NewAd, Service, TokenAmount};
use tracing::info;

/// Publish the demo ads, skipping any that survived a previous run.
pub async fn seed_demo_catalog(service: &Service) -> adeal_core::Result<()> {
    for ad in demo_ads() {
        let id = ad.id.clone();
        match service.publish_ad(ad).await {
            Ok(_) => info!(ad = %id, "seeded demo ad"),
            Err(CoreError::Conflict(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn demo_ads() -> Vec<NewAd> {
    vec![
        NewAd {
            id: "1".into(),
            title: "Premium Running Shoes".into(),
            description: "Get 20% off on the latest collection of running shoes. \
                          Perfect for your fitness goals!"
                .into(),
            image_url: Some(
                "https://via.placeholder.com/300x200/4F46E5/FFFFFF?text=Running+Shoes".into(),
            ),
            advertiser: "SportCo".into(),
            advertiser_reputation: 4.8,
            reward_amount: TokenAmount::from_milli(50),
            category: "Sports & Fitness".into(),
            is_sponsored: true,
        },
        NewAd {
            id: "2".into(),
            title: "Organic Coffee Beans".into(),
            description: "Single-origin coffee beans from Ethiopia. \
                          Freshly roasted and delivered to your door."
                .into(),
            image_url: Some(
                "https://via.placeholder.com/300x200/059669/FFFFFF?text=Coffee+Beans".into(),
            ),
            advertiser: "BeanMaster".into(),
            advertiser_reputation: 4.6,
            reward_amount: TokenAmount::from_milli(30),
            category: "Food & Beverage".into(),
            is_sponsored: true,
        },
    ]
}

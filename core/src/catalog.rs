//! Ad catalog — published ads, keyword search, reputation updates.

use crate::error::{CoreError, Result};
use crate::types::{AdRecord, NewAd};
use crate::{now_ms, Service};

pub(crate) const AD_COLUMNS: &str =
    "id, title, description, image_url, advertiser, advertiser_reputation, \
     reward_amount, category, is_sponsored, published_at";

impl Service {
    /// Publish a new ad. Ad ids are publisher-supplied and unique;
    /// re-publishing an existing id is a conflict, never an overwrite.
    pub async fn publish_ad(&self, ad: NewAd) -> Result<AdRecord> {
        validate_new_ad(&ad)?;

        let published_at = now_ms();
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO ads
                (id, title, description, image_url, advertiser, advertiser_reputation,
                 reward_amount, category, is_sponsored, published_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ad.id)
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(&ad.image_url)
        .bind(&ad.advertiser)
        .bind(ad.advertiser_reputation)
        .bind(ad.reward_amount)
        .bind(&ad.category)
        .bind(ad.is_sponsored)
        .bind(published_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(CoreError::Conflict(format!(
                "ad {} is already published",
                ad.id
            )));
        }

        Ok(AdRecord {
            id: ad.id,
            title: ad.title,
            description: ad.description,
            image_url: ad.image_url,
            advertiser: ad.advertiser,
            advertiser_reputation: ad.advertiser_reputation,
            reward_amount: ad.reward_amount,
            category: ad.category,
            is_sponsored: ad.is_sponsored,
            published_at,
        })
    }

    /// Look up one ad by id.
    pub async fn ad(&self, ad_id: &str) -> Result<Option<AdRecord>> {
        let row = sqlx::query_as::<_, AdRecord>(&format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"
        ))
        .bind(ad_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Substring search over title, description, and category, folding
    /// ASCII case only (to agree with SQLite's `lower()`). Results come
    /// back best-reputation first, then oldest first; a blank query
    /// matches everything.
    pub async fn search_ads(&self, query: &str, limit: Option<usize>) -> Result<Vec<AdRecord>> {
        let limit = limit.unwrap_or(20).min(100) as i64;
        let needle = query.trim().to_ascii_lowercase();

        let rows = if needle.is_empty() {
            sqlx::query_as::<_, AdRecord>(&format!(
                r#"
                SELECT {AD_COLUMNS}
                FROM   ads
                ORDER  BY advertiser_reputation DESC, rowid ASC
                LIMIT  ?1
                "#
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, AdRecord>(&format!(
                r#"
                SELECT {AD_COLUMNS}
                FROM   ads
                WHERE  instr(lower(title), ?1) > 0
                   OR  instr(lower(description), ?1) > 0
                   OR  instr(lower(category), ?1) > 0
                ORDER  BY advertiser_reputation DESC, rowid ASC
                LIMIT  ?2
                "#
            ))
            .bind(&needle)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    /// Overwrite an ad's advertiser reputation score.
    ///
    /// The hook for external reputation recomputation; everything else
    /// about a published ad is immutable.
    pub async fn update_reputation(&self, ad_id: &str, score: f64) -> Result<AdRecord> {
        ensure_score(score)?;

        let mut tx = self.write_tx().await?;
        let updated = sqlx::query("UPDATE ads SET advertiser_reputation = ?2 WHERE id = ?1")
            .bind(ad_id)
            .bind(score)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(CoreError::NotFound(format!("ad {ad_id}")));
        }

        let ad = sqlx::query_as::<_, AdRecord>(&format!(
            "SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"
        ))
        .bind(ad_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(ad)
    }
}

fn validate_new_ad(ad: &NewAd) -> Result<()> {
    let fields = [
        ("id", &ad.id),
        ("title", &ad.title),
        ("description", &ad.description),
        ("advertiser", &ad.advertiser),
        ("category", &ad.category),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "ad {name} must not be blank"
            )));
        }
    }
    if ad.reward_amount.as_milli() < 0 {
        return Err(CoreError::InvalidInput(
            "ad rewardAmount must not be negative".into(),
        ));
    }
    ensure_score(ad.advertiser_reputation)
}

fn ensure_score(score: f64) -> Result<()> {
    if !score.is_finite() || !(0.0..=5.0).contains(&score) {
        return Err(CoreError::InvalidInput(format!(
            "reputation {score} must be between 0 and 5"
        )));
    }
    Ok(())
}

//! Preference store — per-address wishlists that drive ad matching.

use crate::error::{CoreError, Result};
use crate::types::{Priority, WishlistItem, WishlistItemType};
use crate::{ensure_address, now_ms, Service};

impl Service {
    /// Add an entry to `address`'s wishlist. Duplicates are allowed;
    /// content is stored trimmed.
    pub async fn add_wishlist_item(
        &self,
        address: &str,
        item_type: WishlistItemType,
        content: &str,
        priority: Priority,
    ) -> Result<WishlistItem> {
        ensure_address(address)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::InvalidInput(
                "wishlist content must not be blank".into(),
            ));
        }

        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let now = now_ms();
        let id = sqlx::query(
            r#"
            INSERT INTO wishlist_items (address, item_type, content, priority, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(address)
        .bind(item_type)
        .bind(content)
        .bind(priority)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(WishlistItem {
            id,
            address: address.to_string(),
            item_type,
            content: content.to_string(),
            priority,
            created_at: now,
        })
    }

    /// Remove one wishlist entry.
    ///
    /// `NotFound` when the id does not exist in this address's wishlist,
    /// which covers both absent ids and ids owned by someone else.
    pub async fn remove_wishlist_item(&self, address: &str, item_id: i64) -> Result<()> {
        ensure_address(address)?;
        let lock = self.locks.for_address(address);
        let _guard = lock.lock().await;

        let removed = sqlx::query("DELETE FROM wishlist_items WHERE id = ?1 AND address = ?2")
            .bind(item_id)
            .bind(address)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(CoreError::NotFound(format!(
                "wishlist item {item_id} for {address}"
            )));
        }
        Ok(())
    }

    /// All wishlist entries for `address`, oldest first.
    pub async fn wishlist(&self, address: &str) -> Result<Vec<WishlistItem>> {
        ensure_address(address)?;
        let rows = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT id, address, item_type, content, priority, created_at
            FROM   wishlist_items
            WHERE  address = ?1
            ORDER  BY id ASC
            "#,
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

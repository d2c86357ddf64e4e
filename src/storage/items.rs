use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, Item, ItemDbRow, ItemKey, ParsedItem};

impl Database {
    // ========================================================================
    // Item Refresh
    // ========================================================================

    /// Upsert items for a subscription, returns the number of new items inserted
    ///
    /// Existing items keep their read flag; title, url, published, summary and
    /// source id are refreshed from the feed.
    ///
    /// Two-phase insert (INSERT OR IGNORE + UPDATE) with `changes()` counts new
    /// rows without before/after COUNT queries.
    pub async fn upsert_items(
        &self,
        subscription_id: i64,
        items: &[ParsedItem],
    ) -> Result<usize, DatabaseError> {
        if items.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        // 8 columns * 50 stays well under SQLite's 999 parameter limit
        const BATCH_SIZE: usize = 50;
        let mut total_inserted: usize = 0;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut insert_builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO items (subscription_id, guid, source_id, title, url, published, summary, fetched_at) ",
            );

            insert_builder.push_values(chunk, |mut b, item| {
                b.push_bind(subscription_id)
                    .push_bind(&item.guid)
                    .push_bind(&item.source_id)
                    .push_bind(&item.title)
                    .push_bind(&item.url)
                    .push_bind(item.published)
                    .push_bind(&item.summary)
                    .push_bind(now);
            });

            insert_builder.build().execute(&mut *tx).await?;

            let changes: (i64,) = sqlx::query_as("SELECT changes()")
                .fetch_one(&mut *tx)
                .await?;
            total_inserted += changes.0 as usize;

            // Row-at-a-time is fine here: the chunk is already bounded
            for item in chunk {
                sqlx::query(
                    r#"
                    UPDATE items
                    SET source_id = ?, title = ?, url = ?, published = ?, summary = ?
                    WHERE subscription_id = ? AND guid = ?
                "#,
                )
                .bind(&item.source_id)
                .bind(&item.title)
                .bind(&item.url)
                .bind(item.published)
                .bind(&item.summary)
                .bind(subscription_id)
                .bind(&item.guid)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("UPDATE subscriptions SET last_fetched = ? WHERE id = ?")
            .bind(now)
            .bind(subscription_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(total_inserted)
    }

    // ========================================================================
    // Item Queries
    // ========================================================================

    /// Load a single item by its local key
    pub async fn get_item(&self, key: ItemKey) -> Result<Option<Item>, DatabaseError> {
        let row = sqlx::query_as::<_, ItemDbRow>(
            "SELECT id, subscription_id, guid, source_id, title, read FROM items WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ItemDbRow::into_item))
    }

    /// Local keys of a subscription's items, newest first
    pub async fn item_keys_for_subscription(
        &self,
        subscription_id: i64,
    ) -> Result<Vec<ItemKey>, DatabaseError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM items WHERE subscription_id = ? ORDER BY id DESC")
                .bind(subscription_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// All items of a subscription, newest first
    pub async fn get_items_for_subscription(
        &self,
        subscription_id: i64,
    ) -> Result<Vec<Item>, DatabaseError> {
        let rows = sqlx::query_as::<_, ItemDbRow>(
            r#"
            SELECT id, subscription_id, guid, source_id, title, read
            FROM items
            WHERE subscription_id = ?
            ORDER BY id DESC
        "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemDbRow::into_item).collect())
    }

    /// Number of unread items in a subscription
    pub async fn unread_count(&self, subscription_id: i64) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM items WHERE subscription_id = ? AND read = 0")
                .bind(subscription_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ========================================================================
    // Item Mutations
    // ========================================================================

    /// Set the read flag, returns whether the row changed
    ///
    /// The `read != ?` filter keeps the operation idempotent.
    pub async fn set_item_read(&self, key: ItemKey, read: bool) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE items SET read = ? WHERE id = ? AND read != ?")
            .bind(read)
            .bind(key)
            .bind(read)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an item by its local key
    pub async fn remove_item(&self, key: ItemKey) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

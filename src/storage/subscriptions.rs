use sqlx::QueryBuilder;
use std::collections::HashMap;
use std::sync::Arc;

use super::schema::Database;
use super::types::{
    DatabaseError, Metadata, NewSubscription, Subscription, SubscriptionRow, FEED_ID_KEY,
};

impl Database {
    // ========================================================================
    // Subscription Operations
    // ========================================================================

    /// Register subscriptions from the config file (upsert by URL).
    ///
    /// A `feed_id` given in the config overwrites the stored remote feed id;
    /// an absent one leaves whatever is stored alone.
    pub async fn sync_subscriptions(&self, subs: &[NewSubscription]) -> Result<(), DatabaseError> {
        if subs.is_empty() {
            return Ok(());
        }

        const BATCH_SIZE: usize = 100;
        let mut tx = self.pool.begin().await?;

        for chunk in subs.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO subscriptions (title, url) ");

            builder.push_values(chunk, |mut b, sub| {
                b.push_bind(&sub.title).push_bind(&sub.url);
            });

            builder.push(" ON CONFLICT(url) DO UPDATE SET title = excluded.title");
            builder.build().execute(&mut *tx).await?;
        }

        for sub in subs {
            let Some(feed_id) = &sub.feed_id else {
                continue;
            };
            sqlx::query(
                r#"
                INSERT INTO subscription_metadata (subscription_id, key, value)
                SELECT id, ?, ? FROM subscriptions WHERE url = ?
                ON CONFLICT(subscription_id, key) DO UPDATE SET value = excluded.value
            "#,
            )
            .bind(FEED_ID_KEY)
            .bind(feed_id)
            .bind(&sub.url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get all subscriptions together with their metadata, ordered by title
    pub async fn get_subscriptions(&self) -> Result<Vec<Subscription>, DatabaseError> {
        let rows: Vec<SubscriptionRow> =
            sqlx::query_as("SELECT id, title, url, error FROM subscriptions ORDER BY title")
                .fetch_all(&self.pool)
                .await?;

        let meta_rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT subscription_id, key, value FROM subscription_metadata")
                .fetch_all(&self.pool)
                .await?;

        let mut metadata: HashMap<i64, Metadata> = HashMap::new();
        for (subscription_id, key, value) in meta_rows {
            metadata
                .entry(subscription_id)
                .or_default()
                .set(&key, Some(value));
        }

        Ok(rows
            .into_iter()
            .map(|(id, title, source, error)| Subscription {
                id,
                title: Arc::from(title),
                source,
                error,
                metadata: metadata.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    /// Get one subscription with its metadata
    pub async fn get_subscription(&self, id: i64) -> Result<Option<Subscription>, DatabaseError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as("SELECT id, title, url, error FROM subscriptions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, title, source, error)) = row else {
            return Ok(None);
        };

        let metadata: Metadata = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM subscription_metadata WHERE subscription_id = ?",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        Ok(Some(Subscription {
            id,
            title: Arc::from(title),
            source,
            error,
            metadata,
        }))
    }

    /// Persist title, error, metadata and fetch timestamp after an update.
    ///
    /// The stored metadata is replaced wholesale by `sub.metadata`.
    pub async fn save_subscription(&self, sub: &Subscription) -> Result<(), DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE subscriptions SET title = ?, last_fetched = ?, error = ? WHERE id = ?")
            .bind(&*sub.title)
            .bind(now)
            .bind(sub.error.as_deref())
            .bind(sub.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM subscription_metadata WHERE subscription_id = ?")
            .bind(sub.id)
            .execute(&mut *tx)
            .await?;

        if !sub.metadata.is_empty() {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO subscription_metadata (subscription_id, key, value) ",
            );
            builder.push_values(sub.metadata.iter(), |mut b, (key, value)| {
                b.push_bind(sub.id).push_bind(key).push_bind(value);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Set or clear the error status for a subscription
    pub async fn set_subscription_error(
        &self,
        subscription_id: i64,
        error: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE subscriptions SET error = ? WHERE id = ?")
            .bind(error)
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

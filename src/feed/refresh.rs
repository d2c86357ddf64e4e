use std::sync::Arc;

use super::fetcher::UpdateResult;
use super::parser::{parse_feed, ParsedFeed};
use crate::storage::{Database, Metadata, Subscription};
use crate::sync::{ContentRefresh, NewItemCount, SyncError};

/// Options for one feed refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateFlags {
    /// Take the subscription title from the feed document.
    pub reset_title: bool,
}

/// Metadata keys the generic refresh derives from the feed document.
pub const HOMEPAGE_KEY: &str = "homepage";
pub const DESCRIPTION_KEY: &str = "description";

/// The generic Atom/RSS refresh: parse the body, store its items, and
/// rebuild the subscription's metadata from the feed document.
///
/// Rebuilding replaces the whole metadata map, so any key the feed format
/// does not know about is gone afterwards.
#[derive(Clone)]
pub struct FeedRefresher {
    db: Database,
    counter: NewItemCount,
}

impl FeedRefresher {
    pub fn new(db: Database, counter: NewItemCount) -> Self {
        Self { db, counter }
    }
}

fn feed_metadata(feed: &ParsedFeed) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.set(HOMEPAGE_KEY, feed.homepage.clone());
    metadata.set(DESCRIPTION_KEY, feed.description.clone());
    metadata
}

impl ContentRefresh for FeedRefresher {
    async fn process(
        &self,
        subscription: &mut Subscription,
        result: &UpdateResult,
        flags: UpdateFlags,
    ) -> Result<usize, SyncError> {
        let Some(data) = result.data.as_deref() else {
            return Ok(0);
        };

        let feed = match parse_feed(data) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(
                    subscription_id = subscription.id,
                    source = %result.source,
                    error = %e,
                    "Feed document could not be parsed"
                );
                subscription.error = Some(format!("Parse error: {e}"));
                return Ok(0);
            }
        };

        subscription.metadata = feed_metadata(&feed);
        if flags.reset_title || subscription.title.is_empty() {
            if let Some(title) = feed.title.as_deref().filter(|t| !t.trim().is_empty()) {
                subscription.title = Arc::from(title.trim());
            }
        }

        let inserted = self.db.upsert_items(subscription.id, &feed.items).await?;
        self.counter.add(inserted as u64);
        subscription.error = None;

        tracing::debug!(
            subscription_id = subscription.id,
            items = feed.items.len(),
            new = inserted,
            "Feed refreshed"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewSubscription, FEED_ID_KEY};
    use crate::sync::NewItemCounter;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <link rel="alternate" href="https://blog.example.com/"/>
  <id>tag:google.com,2005:reader/feed/1</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>tag:google.com,2005:reader/item/0001</id>
    <title>First</title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    async fn setup() -> (Database, Subscription) {
        let db = Database::open(":memory:").await.unwrap();
        db.sync_subscriptions(&[NewSubscription {
            title: "Configured".into(),
            url: "https://blog.example.com/feed".into(),
            feed_id: Some("1".into()),
        }])
        .await
        .unwrap();
        let sub = db.get_subscriptions().await.unwrap().remove(0);
        (db, sub)
    }

    fn result(body: &str) -> UpdateResult {
        UpdateResult {
            source: "http://theoldreader.com/reader/atom/1".into(),
            http_status: 200,
            data: Some(body.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn test_refresh_stores_items_and_counts_new() {
        let (db, mut sub) = setup().await;
        let counter = NewItemCount::new();
        let refresher = FeedRefresher::new(db.clone(), counter.clone());

        let new = refresher
            .process(&mut sub, &result(ATOM), UpdateFlags::default())
            .await
            .unwrap();
        assert_eq!(new, 1);
        assert_eq!(counter.get(), 1);

        let items = db.get_items_for_subscription(sub.id).await.unwrap();
        assert_eq!(
            items[0].source_id.as_deref(),
            Some("tag:google.com,2005:reader/item/0001")
        );

        // Second refresh of the same document adds nothing
        let new = refresher
            .process(&mut sub, &result(ATOM), UpdateFlags::default())
            .await
            .unwrap();
        assert_eq!(new, 0);
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn test_refresh_rebuilds_metadata() {
        let (db, mut sub) = setup().await;
        assert_eq!(sub.feed_id(), Some("1"));
        let refresher = FeedRefresher::new(db, NewItemCount::new());

        refresher
            .process(&mut sub, &result(ATOM), UpdateFlags::default())
            .await
            .unwrap();
        assert_eq!(sub.metadata.get(FEED_ID_KEY), None);
        assert_eq!(
            sub.metadata.get(HOMEPAGE_KEY),
            Some("https://blog.example.com/")
        );
    }

    #[tokio::test]
    async fn test_reset_title_flag() {
        let (db, mut sub) = setup().await;
        let refresher = FeedRefresher::new(db, NewItemCount::new());

        refresher
            .process(&mut sub, &result(ATOM), UpdateFlags::default())
            .await
            .unwrap();
        assert_eq!(&*sub.title, "Configured");

        refresher
            .process(&mut sub, &result(ATOM), UpdateFlags { reset_title: true })
            .await
            .unwrap();
        assert_eq!(&*sub.title, "Example Blog");
    }

    #[tokio::test]
    async fn test_unparseable_body_is_soft() {
        let (db, mut sub) = setup().await;
        let refresher = FeedRefresher::new(db, NewItemCount::new());

        let new = refresher
            .process(&mut sub, &result("<not valid xml"), UpdateFlags::default())
            .await
            .unwrap();
        assert_eq!(new, 0);
        assert!(sub.error.is_some());
    }

    #[tokio::test]
    async fn test_no_body_is_noop() {
        let (db, mut sub) = setup().await;
        let refresher = FeedRefresher::new(db, NewItemCount::new());
        let empty = UpdateResult {
            data: None,
            ..result("")
        };

        assert_eq!(
            refresher
                .process(&mut sub, &empty, UpdateFlags::default())
                .await
                .unwrap(),
            0
        );
        assert_eq!(sub.feed_id(), Some("1"));
    }
}

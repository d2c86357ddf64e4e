use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of oldreader-sync appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as text only
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Keys
// ============================================================================

/// Local surrogate key of a persisted item.
pub type ItemKey = i64;

/// Metadata key holding the remote feed identifier of a subscription.
///
/// The generic feed refresh rebuilds subscription metadata from the feed
/// document and does not know this key.
pub const FEED_ID_KEY: &str = "theoldreader-feed-id";

// ============================================================================
// Subscription
// ============================================================================

/// String metadata attached to a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set or remove a value. `None` removes the key.
    pub fn set(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(value) => {
                self.entries.insert(key.to_string(), value);
            }
            None => {
                self.entries.remove(key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A remote feed binding and its local state.
///
/// `id` is the local node id; `source` is the URL the subscription was
/// registered with.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: i64,
    pub title: Arc<str>,
    pub source: String,
    pub error: Option<String>,
    pub metadata: Metadata,
}

impl Subscription {
    /// The remote feed identifier, if one has been assigned.
    pub fn feed_id(&self) -> Option<&str> {
        self.metadata.get(FEED_ID_KEY)
    }
}

/// Row type for subscription queries
pub(crate) type SubscriptionRow = (i64, String, String, Option<String>);

/// A subscription to register, as listed in the config file
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub title: String,
    pub url: String,
    pub feed_id: Option<String>,
}

// ============================================================================
// Items
// ============================================================================

/// Represents a parsed item from a feed, ready to be upserted
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub guid: String,
    /// Identifier of the item inside the remote service (Atom `<id>`).
    pub source_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub published: Option<i64>,
    pub summary: Option<String>,
}

/// Internal row type for Item queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemDbRow {
    pub id: i64,
    pub subscription_id: i64,
    pub guid: String,
    pub source_id: Option<String>,
    pub title: String,
    pub read: bool,
}

impl ItemDbRow {
    pub(crate) fn into_item(self) -> Item {
        Item {
            id: self.id,
            subscription_id: self.subscription_id,
            guid: self.guid,
            source_id: self.source_id.filter(|s| !s.is_empty()),
            title: Arc::from(self.title),
            read: self.read,
        }
    }
}

/// A locally persisted item, checked out of the store by value.
///
/// Dropping the value releases it; nothing in the store keeps a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemKey,
    pub subscription_id: i64,
    pub guid: String,
    /// Remote correlation id; `None` when the item has no usable one.
    pub source_id: Option<String>,
    pub title: Arc<str>,
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_set_none_removes_key() {
        let mut metadata = Metadata::new();
        metadata.set(FEED_ID_KEY, Some("feed/123".to_string()));
        assert_eq!(metadata.get(FEED_ID_KEY), Some("feed/123"));

        metadata.set(FEED_ID_KEY, None);
        assert_eq!(metadata.get(FEED_ID_KEY), None);
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_metadata_set_overwrites() {
        let mut metadata = Metadata::new();
        metadata.set("homepage", Some("https://a.example".to_string()));
        metadata.set("homepage", Some("https://b.example".to_string()));
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("homepage"), Some("https://b.example"));
    }

    #[test]
    fn test_empty_source_id_is_none() {
        let row = ItemDbRow {
            id: 1,
            subscription_id: 1,
            guid: "g".into(),
            source_id: Some(String::new()),
            title: "t".into(),
            read: false,
        };
        assert_eq!(row.into_item().source_id, None);
    }

    #[test]
    fn test_lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("SQLITE_BUSY"));
        assert!(!is_lock_message("no such table: items"));
    }
}

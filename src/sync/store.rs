//! Seams between the reconciliation pass and the rest of the application.
//!
//! The pass only sees the local store through these traits, which keeps it
//! testable against in-memory fakes with call counting.

use std::future::Future;

use super::SyncError;
use crate::feed::{UpdateFlags, UpdateResult};
use crate::storage::{Database, DatabaseError, Item, ItemKey, Subscription};

/// Local item persistence as seen by the resolver.
///
/// Items are checked out by value; dropping an [`Item`] releases it.
pub trait ItemStore {
    fn load_item(
        &self,
        key: ItemKey,
    ) -> impl Future<Output = Result<Option<Item>, DatabaseError>> + Send;

    /// Ordered local keys of a subscription's items.
    ///
    /// The order only has to be stable for the duration of one pass.
    fn item_sequence(
        &self,
        subscription_id: i64,
    ) -> impl Future<Output = Result<Vec<ItemKey>, DatabaseError>> + Send;

    fn remove_item(&self, key: ItemKey) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}

/// Applies a read-state change to a local item.
///
/// Implementations may touch the global new-item counter as a side effect.
pub trait ReadStateMutator {
    fn set_read_state(
        &self,
        item: &Item,
        read: bool,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}

/// The generic feed refresh that runs before read-state reconciliation.
///
/// Returns the number of new items. May replace `subscription.metadata`.
pub trait ContentRefresh {
    fn process(
        &self,
        subscription: &mut Subscription,
        result: &UpdateResult,
        flags: UpdateFlags,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;
}

impl ItemStore for Database {
    async fn load_item(&self, key: ItemKey) -> Result<Option<Item>, DatabaseError> {
        self.get_item(key).await
    }

    async fn item_sequence(&self, subscription_id: i64) -> Result<Vec<ItemKey>, DatabaseError> {
        self.item_keys_for_subscription(subscription_id).await
    }

    async fn remove_item(&self, key: ItemKey) -> Result<(), DatabaseError> {
        Database::remove_item(self, key).await
    }
}

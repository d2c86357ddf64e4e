use crate::storage::DatabaseError;
use crate::sync::ItemStore;

/// Prefix every TheOldReader item id starts with (Google Reader heritage).
pub const REMOTE_ID_PREFIX: &str = "tag:google.com";

/// Remove items whose source id did not come from TheOldReader.
///
/// Subscriptions that were previously fetched straight from the publisher
/// carry the publisher's ids, which can never match a remote entry. Those
/// items are deleted so the next update recreates them with remote ids.
/// Items without a source id are kept. Returns the number of items removed.
pub async fn migrate_subscription<S: ItemStore>(
    store: &S,
    subscription_id: i64,
) -> Result<usize, DatabaseError> {
    let mut removed = 0;

    for key in store.item_sequence(subscription_id).await? {
        let Some(item) = store.load_item(key).await? else {
            continue;
        };
        let Some(source_id) = item.source_id.as_deref() else {
            continue;
        };
        if !source_id.starts_with(REMOTE_ID_PREFIX) {
            tracing::debug!(
                subscription_id = subscription_id,
                source_id = %source_id,
                "Item with foreign source id will be deleted"
            );
            store.remove_item(key).await?;
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!(
            subscription_id = subscription_id,
            removed = removed,
            "Removed items with foreign source ids"
        );
    }
    Ok(removed)
}

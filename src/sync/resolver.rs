use super::cache::IdCache;
use super::store::ItemStore;
use crate::storage::{DatabaseError, Item};

/// Find the local item whose source id equals `remote_id`.
///
/// A cache hit costs one load. On a miss the subscription's item sequence is
/// scanned from the cache's visited cursor onwards; every scanned item with a
/// source id is cached, whether it matches or not, and the scan stops at the
/// first match. Across all calls of one pass each item is loaded at most once
/// by the scan. Once a scan has reached the end of the sequence, further
/// misses return without querying the store.
///
/// Returns `Ok(None)` when no item matches, which is expected when items were
/// purged locally after the remote snapshot was taken.
pub async fn resolve<S: ItemStore>(
    store: &S,
    subscription_id: i64,
    remote_id: &str,
    cache: &mut IdCache,
) -> Result<Option<Item>, DatabaseError> {
    if let Some(key) = cache.lookup(remote_id) {
        let item = store.load_item(key).await?;
        return Ok(match item {
            Some(item) if item.source_id.as_deref() == Some(remote_id) => Some(item),
            Some(_) | None => {
                tracing::warn!(
                    subscription_id = subscription_id,
                    remote_id = %remote_id,
                    key = key,
                    "Cached item no longer carries this remote id"
                );
                None
            }
        });
    }

    if !cache.is_exhausted() {
        let sequence = store.item_sequence(subscription_id).await?;
        for &key in sequence.iter().skip(cache.visited()) {
            cache.mark_visited();

            let Some(item) = store.load_item(key).await? else {
                continue;
            };
            if let Some(source_id) = item.source_id.as_deref() {
                cache.insert(source_id, item.id);
                if source_id == remote_id {
                    return Ok(Some(item));
                }
            }
        }
        cache.mark_exhausted();
    }

    tracing::warn!(
        subscription_id = subscription_id,
        remote_id = %remote_id,
        "Could not find item for remote id"
    );
    Ok(None)
}

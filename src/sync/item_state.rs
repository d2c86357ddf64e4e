use super::counter::{NewItemCount, NewItemCounter};
use super::store::ReadStateMutator;
use crate::storage::{Database, DatabaseError, Item};

/// Database-backed read-state changes.
///
/// Marking an item read means the user has seen what is new, so the global
/// new-item counter drops to zero, the same as when an item is opened.
#[derive(Clone)]
pub struct ItemStateUpdater {
    db: Database,
    counter: NewItemCount,
}

impl ItemStateUpdater {
    pub fn new(db: Database, counter: NewItemCount) -> Self {
        Self { db, counter }
    }
}

impl ReadStateMutator for ItemStateUpdater {
    async fn set_read_state(&self, item: &Item, read: bool) -> Result<(), DatabaseError> {
        let changed = self.db.set_item_read(item.id, read).await?;
        if changed && read {
            self.counter.set(0);
        }
        Ok(())
    }
}

use thiserror::Error;

use crate::feed::FetchError;
use crate::storage::DatabaseError;

/// Errors that end a sync step for one subscription.
///
/// Remote-document problems (missing ids, unknown items, malformed bodies)
/// are not errors at this level: the reconciliation pass logs them and
/// carries on. What remains is local storage failing underneath the pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Transport failure while fetching the remote document
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

use thiserror::Error;

use super::document::RemoteEntry;

/// Category label that marks an entry as read.
///
/// TheOldReader exposes neither a starred label nor its "like" feature, so
/// every other label is ignored.
pub const READ_LABEL: &str = "read";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("entry has no id")]
    MissingIdentifier,
}

/// Remote id and read flag of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryState {
    pub remote_id: String,
    pub read: bool,
}

/// Apply the remote format's read-state convention to an entry.
///
/// An entry is read iff one of its category labels is exactly `read`.
/// An `<id>` that is present but blank counts as missing.
pub fn extract(entry: &RemoteEntry) -> Result<EntryState, ExtractError> {
    let remote_id = entry
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or(ExtractError::MissingIdentifier)?;

    Ok(EntryState {
        remote_id: remote_id.to_string(),
        read: entry.labels.iter().any(|label| label == READ_LABEL),
    })
}

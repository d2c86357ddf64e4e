//! Local read-state edits submitted upstream but not yet confirmed.
//!
//! The upload side owns the queue; reconciliation only asks whether an id is
//! in it, so that a user's latest action is not undone by a stale snapshot.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    MarkRead,
    MarkUnread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    /// Remote id of the edited item.
    pub remote_id: String,
    pub action: EditAction,
}

/// Read-only membership query against pending edits.
pub trait PendingEdits {
    fn is_pending(&self, remote_id: &str) -> bool;
}

/// FIFO of edits waiting for the remote service to acknowledge them.
#[derive(Debug, Default)]
pub struct EditQueue {
    edits: VecDeque<PendingEdit>,
}

impl EditQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, remote_id: impl Into<String>, action: EditAction) {
        self.edits.push_back(PendingEdit {
            remote_id: remote_id.into(),
            action,
        });
    }

    /// Drop the oldest edit for `remote_id` once the service confirmed it.
    /// Returns the acknowledged edit, if any was queued.
    pub fn acknowledge(&mut self, remote_id: &str) -> Option<PendingEdit> {
        let pos = self.edits.iter().position(|e| e.remote_id == remote_id)?;
        self.edits.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl PendingEdits for EditQueue {
    fn is_pending(&self, remote_id: &str) -> bool {
        self.edits.iter().any(|e| e.remote_id == remote_id)
    }
}

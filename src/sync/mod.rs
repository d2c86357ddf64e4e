//! Read-state reconciliation against TheOldReader.
//!
//! One pass takes a fetched Atom document for one subscription, runs the
//! generic content refresh, and then walks the document's entries:
//!
//! - [`document`] pulls entry ids and category labels out of the body
//! - [`extract`] turns an entry into a remote id and read flag
//! - [`resolver`] maps the remote id to a local item through a pass-scoped
//!   [`IdCache`]
//! - [`reconcile`] drives the pass, vetoing items with pending local edits
//!   and keeping the feed id metadata and the new-item counter intact
//!
//! [`runner`] fetches all subscriptions and feeds the results through the
//! pass one at a time.

mod cache;
mod counter;
mod document;
mod error;
mod extract;
mod item_state;
mod reconcile;
mod resolver;
mod runner;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::IdCache;
pub use counter::{NewItemCount, NewItemCounter, SuppressedCount};
pub use document::{parse_entries, DocumentError, RemoteEntry};
pub use error::SyncError;
pub use extract::{extract, EntryState, ExtractError, READ_LABEL};
pub use item_state::ItemStateUpdater;
pub use reconcile::{PassOutcome, PassStats, Reconciler};
pub use resolver::resolve;
pub use runner::{sync_all, SyncOptions, SyncSummary};
pub use store::{ContentRefresh, ItemStore, ReadStateMutator};

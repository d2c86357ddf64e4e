use std::time::Instant;

use super::cache::IdCache;
use super::counter::{NewItemCounter, SuppressedCount};
use super::document::parse_entries;
use super::extract::extract;
use super::resolver::resolve;
use super::store::{ContentRefresh, ItemStore, ReadStateMutator};
use super::SyncError;
use crate::feed::{UpdateFlags, UpdateResult};
use crate::source::PendingEdits;
use crate::storage::{Subscription, FEED_ID_KEY};

/// Counters for one completed reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Entry elements seen in the remote document.
    pub entries: usize,
    /// Entries skipped because they had no id.
    pub missing_id: usize,
    /// Entries with no matching local item.
    pub unresolved: usize,
    /// Entries whose change was vetoed by a pending local edit.
    pub guarded: usize,
    /// Read-state changes applied locally.
    pub changed: usize,
}

/// How a reconciliation pass ended.
///
/// The content refresh and metadata restore have run in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The update carried no body.
    NoBody,
    Completed(PassStats),
    /// The body was not a well-formed document; no read state was touched.
    ParseFailed,
}

impl PassOutcome {
    pub fn changed(&self) -> usize {
        match self {
            PassOutcome::Completed(stats) => stats.changed,
            PassOutcome::NoBody | PassOutcome::ParseFailed => 0,
        }
    }
}

/// Brings a subscription's local read state in line with one remote snapshot.
///
/// All collaborators are borrowed for the lifetime of the reconciler. The
/// `&mut Subscription` taken by [`Reconciler::reconcile`] gives the pass
/// exclusive access to the subscription for its duration.
pub struct Reconciler<'a, S, R, M, P, C> {
    store: &'a S,
    refresh: &'a R,
    mutator: &'a M,
    pending: &'a P,
    counter: &'a C,
    log_raw_bodies: bool,
}

impl<'a, S, R, M, P, C> Reconciler<'a, S, R, M, P, C>
where
    S: ItemStore,
    R: ContentRefresh,
    M: ReadStateMutator,
    P: PendingEdits,
    C: NewItemCounter,
{
    pub fn new(
        store: &'a S,
        refresh: &'a R,
        mutator: &'a M,
        pending: &'a P,
        counter: &'a C,
    ) -> Self {
        Self {
            store,
            refresh,
            mutator,
            pending,
            counter,
            log_raw_bodies: false,
        }
    }

    /// Emit each remote body at trace level before parsing it.
    pub fn log_raw_bodies(mut self, enabled: bool) -> Self {
        self.log_raw_bodies = enabled;
        self
    }

    /// Run the content refresh, then apply the remote read flags.
    ///
    /// The feed id metadata value is restored after the refresh whether or
    /// not the refresh succeeded, and the new-item counter reads the same
    /// before and after the pass.
    pub async fn reconcile(
        &self,
        subscription: &mut Subscription,
        result: &UpdateResult,
        flags: UpdateFlags,
    ) -> Result<PassOutcome, SyncError> {
        let started = Instant::now();

        let feed_id = subscription.metadata.get(FEED_ID_KEY).map(str::to_string);
        let refreshed = self.refresh.process(subscription, result, flags).await;
        subscription.metadata.set(FEED_ID_KEY, feed_id);
        refreshed?;

        let Some(body) = result.data.as_deref() else {
            return Ok(PassOutcome::NoBody);
        };

        let _suppressed = SuppressedCount::new(self.counter);

        if self.log_raw_bodies {
            tracing::trace!(
                subscription_id = subscription.id,
                body = %String::from_utf8_lossy(body),
                "Raw TheOldReader response"
            );
        }

        let entries = match parse_entries(body) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    subscription_id = subscription.id,
                    source = %result.source,
                    error = %e,
                    "Could not parse TheOldReader response, skipping read state"
                );
                return Ok(PassOutcome::ParseFailed);
            }
        };

        let mut cache = IdCache::new();
        let mut stats = PassStats {
            entries: entries.len(),
            ..PassStats::default()
        };

        for entry in &entries {
            let state = match extract(entry) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(subscription_id = subscription.id, error = %e, "Skipping entry");
                    stats.missing_id += 1;
                    continue;
                }
            };

            let resolved =
                resolve(self.store, subscription.id, &state.remote_id, &mut cache).await?;
            let Some(item) = resolved else {
                stats.unresolved += 1;
                continue;
            };

            if item.read == state.read {
                continue;
            }

            if self.pending.is_pending(&state.remote_id) {
                tracing::debug!(
                    remote_id = %state.remote_id,
                    "Local edit pending, keeping local read state"
                );
                stats.guarded += 1;
                continue;
            }

            tracing::debug!(
                item_id = item.id,
                remote_id = %state.remote_id,
                read = state.read,
                "Applying remote read state"
            );
            self.mutator.set_read_state(&item, state.read).await?;
            stats.changed += 1;
        }

        tracing::debug!(
            subscription_id = subscription.id,
            entries = stats.entries,
            changed = stats.changed,
            unresolved = stats.unresolved,
            cached = cache.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciled read state"
        );
        Ok(PassOutcome::Completed(stats))
    }
}

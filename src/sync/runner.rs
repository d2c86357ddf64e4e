use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;

use super::counter::NewItemCount;
use super::item_state::ItemStateUpdater;
use super::reconcile::Reconciler;
use super::SyncError;
use crate::config::Config;
use crate::feed::{fetch_update, FeedRefresher, UpdateFlags};
use crate::source::{prepare_update_request, LoginState, NotReady, ReaderSource};
use crate::storage::Database;

/// Knobs for one [`sync_all`] run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub max_concurrent_fetches: usize,
    pub request_timeout: Duration,
    pub log_raw_responses: bool,
    pub flags: UpdateFlags,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            log_raw_responses: config.log_raw_responses,
            flags: UpdateFlags::default(),
        }
    }
}

/// What a sync run did, printable as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Subscriptions fetched and reconciled.
    pub synced: usize,
    /// Subscriptions whose fetch or update failed.
    pub failed: usize,
    /// Subscriptions without a TheOldReader feed id.
    pub skipped: usize,
    /// Local read-state changes applied.
    pub changed: usize,
    /// No credentials were available, nothing was fetched.
    pub login_required: bool,
}

/// Fetch every subscription's Atom document and reconcile it.
///
/// Downloads run concurrently, up to `max_concurrent_fetches` at a time,
/// but completed downloads are reconciled one after another, so no two
/// passes ever touch the store at once. A failure is recorded on its
/// subscription and does not stop the run; only failing to list the
/// subscriptions is returned as an error.
pub async fn sync_all(
    db: &Database,
    client: &reqwest::Client,
    source: &ReaderSource,
    counter: &NewItemCount,
    options: &SyncOptions,
) -> Result<SyncSummary, SyncError> {
    let mut summary = SyncSummary::default();

    if source.login_state() == LoginState::None {
        tracing::warn!("No TheOldReader credentials, skipping update");
        summary.login_required = true;
        return Ok(summary);
    }

    let mut prepared = Vec::new();
    for sub in db.get_subscriptions().await? {
        match prepare_update_request(source, &sub) {
            Ok(request) => prepared.push((sub, request)),
            Err(NotReady::MissingFeedId { .. }) => summary.skipped += 1,
            Err(NotReady::LoggedOut) => {
                summary.login_required = true;
                return Ok(summary);
            }
            Err(e @ NotReady::InvalidHost(_)) => {
                tracing::error!(error = %e, "Cannot build update request");
                db.set_subscription_error(sub.id, Some(e.to_string().as_str())).await?;
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        subscriptions = prepared.len(),
        skipped = summary.skipped,
        "Updating TheOldReader subscriptions"
    );

    let refresh = FeedRefresher::new(db.clone(), counter.clone());
    let mutator = ItemStateUpdater::new(db.clone(), counter.clone());
    let reconciler = Reconciler::new(db, &refresh, &mutator, source, counter)
        .log_raw_bodies(options.log_raw_responses);

    let timeout = options.request_timeout;
    let mut fetches = stream::iter(prepared)
        .map(|(sub, request)| async move {
            let fetched = fetch_update(client, &request, timeout).await;
            (sub, fetched)
        })
        .buffer_unordered(options.max_concurrent_fetches.max(1));

    while let Some((mut sub, fetched)) = fetches.next().await {
        let result = match fetched {
            Ok(result) => {
                tracing::debug!(
                    subscription_id = sub.id,
                    status = result.http_status,
                    bytes = result.data.as_ref().map_or(0, Vec::len),
                    "Fetched subscription"
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = sub.id,
                    title = %sub.title,
                    error = %e,
                    "Failed to fetch subscription"
                );
                db.set_subscription_error(sub.id, Some(e.to_string().as_str())).await?;
                summary.failed += 1;
                continue;
            }
        };

        match reconciler.reconcile(&mut sub, &result, options.flags).await {
            Ok(outcome) => {
                db.save_subscription(&sub).await?;
                summary.synced += 1;
                summary.changed += outcome.changed();
            }
            Err(e) => {
                tracing::error!(
                    subscription_id = sub.id,
                    title = %sub.title,
                    error = %e,
                    "Failed to update subscription"
                );
                db.set_subscription_error(sub.id, Some(e.to_string().as_str())).await?;
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        synced = summary.synced,
        failed = summary.failed,
        skipped = summary.skipped,
        changed = summary.changed,
        "Sync finished"
    );
    Ok(summary)
}

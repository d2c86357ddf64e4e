use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use super::{LoginState, ReaderSource};
use crate::storage::Subscription;

/// Why a per-feed update request could not be prepared.
///
/// None of these are failures of the update itself: the caller falls back
/// to a source-level update (or skips the feed) instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotReady {
    #[error("not logged in to TheOldReader")]
    LoggedOut,

    #[error("subscription '{url}' ({node_id}) has no TheOldReader feed id")]
    MissingFeedId { url: String, node_id: i64 },

    #[error("invalid service host '{0}'")]
    InvalidHost(String),
}

/// Where and how to fetch one feed's Atom document.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub source: Url,
    pub auth_value: Option<SecretString>,
}

/// Point a subscription's update at the service's per-feed Atom endpoint.
///
/// The URL is `http://<host>/reader/atom/<feed-id>`, with the feed id taken
/// from the subscription's metadata, and the request carries the source's
/// stored auth header value.
pub fn prepare_update_request(
    source: &ReaderSource,
    subscription: &Subscription,
) -> Result<UpdateRequest, NotReady> {
    tracing::debug!(
        subscription_id = subscription.id,
        "Preparing TheOldReader feed subscription for update"
    );

    if source.login_state() == LoginState::None {
        return Err(NotReady::LoggedOut);
    }

    let Some(feed_id) = subscription.feed_id() else {
        tracing::warn!(
            source = %subscription.source,
            node_id = subscription.id,
            "Skipping TheOldReader feed without id"
        );
        return Err(NotReady::MissingFeedId {
            url: subscription.source.clone(),
            node_id: subscription.id,
        });
    };

    let mut url = Url::parse(&format!("http://{}/reader/atom/", source.host()))
        .map_err(|_| NotReady::InvalidHost(source.host().to_string()))?;
    url.path_segments_mut()
        .map_err(|_| NotReady::InvalidHost(source.host().to_string()))?
        .pop_if_empty()
        .push(feed_id);

    tracing::debug!(
        subscription = %subscription.source,
        url = %url,
        "Setting auth header for a TheOldReader subscription"
    );

    Ok(UpdateRequest {
        source: url,
        auth_value: source.auth_header_value().cloned(),
    })
}

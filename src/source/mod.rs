//! The TheOldReader account a set of subscriptions belongs to.
//!
//! - [`edit`]: pending local edits not yet confirmed upstream
//! - [`request`]: per-feed update request preparation
//! - [`migrate`]: purge of items carrying foreign remote ids

mod edit;
mod migrate;
mod request;

use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;

pub use edit::{EditAction, EditQueue, PendingEdit, PendingEdits};
pub use migrate::{migrate_subscription, REMOTE_ID_PREFIX};
pub use request::{prepare_update_request, NotReady, UpdateRequest};

/// Environment variable that overrides `auth_token` from the config file.
pub const AUTH_TOKEN_ENV: &str = "THEOLDREADER_AUTH_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    None,
    Active,
}

#[derive(Debug)]
pub struct ReaderSource {
    host: String,
    login_state: LoginState,
    auth_header_value: Option<SecretString>,
    pub edits: EditQueue,
}

impl ReaderSource {
    /// A source that has not logged in yet.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            login_state: LoginState::None,
            auth_header_value: None,
            edits: EditQueue::new(),
        }
    }

    /// A source holding a ClientLogin token from an earlier login.
    pub fn with_token(host: impl Into<String>, token: &SecretString) -> Self {
        let header = format!("GoogleLogin auth={}", token.expose_secret());
        Self {
            host: host.into(),
            login_state: LoginState::Active,
            auth_header_value: Some(SecretString::from(header)),
            edits: EditQueue::new(),
        }
    }

    /// Build from config; the environment token takes precedence.
    pub fn from_config(config: &Config) -> Self {
        let env_token = std::env::var(AUTH_TOKEN_ENV).ok().map(SecretString::from);
        Self::from_config_and_token(config, env_token)
    }

    fn from_config_and_token(config: &Config, env_token: Option<SecretString>) -> Self {
        let token = env_token.or_else(|| config.auth_token.clone().map(SecretString::from));
        match token {
            Some(token) if !token.expose_secret().trim().is_empty() => {
                Self::with_token(&config.service_host, &token)
            }
            _ => Self::new(&config.service_host),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn login_state(&self) -> LoginState {
        self.login_state
    }

    pub fn auth_header_value(&self) -> Option<&SecretString> {
        self.auth_header_value.as_ref()
    }
}

impl PendingEdits for ReaderSource {
    fn is_pending(&self, remote_id: &str) -> bool {
        self.edits.is_pending(remote_id)
    }
}

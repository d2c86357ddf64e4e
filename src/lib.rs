//! Keeps local read state of TheOldReader subscriptions in sync with the
//! service's per-feed Atom documents.

pub mod config;
pub mod feed;
pub mod source;
pub mod storage;
pub mod sync;

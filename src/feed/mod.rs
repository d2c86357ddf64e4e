//! Generic feed handling: fetching, parsing, and the content refresh.
//!
//! - [`fetcher`] - HTTP retrieval with retry logic and a size limit
//! - [`parser`] - RSS/Atom parsing using the `feed-rs` crate
//! - [`refresh`] - Stores parsed items and rebuilds subscription metadata
//!
//! Nothing here knows about TheOldReader's read state; that lives in
//! [`crate::sync`].

mod fetcher;
mod parser;
mod refresh;

pub use fetcher::{fetch_update, FetchError, UpdateResult};
pub use parser::{parse_feed, ParsedFeed};
pub use refresh::{FeedRefresher, UpdateFlags, DESCRIPTION_KEY, HOMEPAGE_KEY};

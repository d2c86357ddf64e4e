mod items;
mod schema;
mod subscriptions;
mod types;

pub use schema::Database;
pub use types::{
    DatabaseError, Item, ItemKey, Metadata, NewSubscription, ParsedItem, Subscription,
    FEED_ID_KEY,
};

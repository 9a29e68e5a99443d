// Entry cache: the keyed store of query results shared by both coordinators

pub mod entry;
pub mod store;
pub mod value;

pub use entry::{CacheEntry, QueryStatus};
pub use store::{EntryCache, Snapshot};
pub use value::{CacheData, CachedValue};

pub mod coordinator;
pub mod fetchers;
pub mod options;
pub mod state;

pub use coordinator::QueryCoordinator;
pub use fetchers::{FetchFn, FetchFuture};
pub use options::QueryOptions;
pub use state::QueryState;

pub mod cache;
pub mod optimistic;
pub mod reviews;
pub mod watchlist;

pub use cache::{Entity, EntityCache};
pub use optimistic::optimistic;
pub use reviews::{ReviewReconciler, ReviewState};
pub use watchlist::{ToggleOutcome, WatchlistSet};

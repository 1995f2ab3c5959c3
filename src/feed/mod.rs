//! The paginated review feed.
//!
//! - `loader` - the review source boundary and its page loader
//! - `state` - the synchronous pagination state machine
//! - `populator` - spawns one image fetch per empty slot
//! - `controller` - the task that owns the state and sequences completions
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut notifications) = mpsc::unbounded_channel();
//! let controller = FeedController::new(FeedSettings::default(), loader, cache, tx);
//! let (feed, _task) = controller.spawn();
//!
//! feed.request_more().await?;
//! while let Some(FeedNotification::StateChanged(snapshot)) = notifications.recv().await {
//!     render(&snapshot.items);
//! }
//! ```

mod controller;
mod loader;
mod populator;
mod state;

pub use controller::{
    FeedClosed, FeedCommand, FeedController, FeedEvent, FeedHandle, FeedNotification, FeedSettings,
};
pub use loader::{FetchError, InMemorySource, JsonFileSource, PageLoader, ReviewSource};
pub use populator::ImagePopulator;
pub use state::{
    FeedSnapshot, FeedState, PageOutcome, PageRequest, ScrollMetrics, DEFAULT_PAGE_SIZE,
    DEFAULT_PREFETCH_SCREENS,
};

//! Paginated review feed.
//!
//! Reviews are pulled a page at a time from a [`ReviewSource`](feed::ReviewSource)
//! as the reader scrolls, each review's avatar and photos are fetched in the
//! background through a coalescing [`ImageCache`](images::ImageCache), and
//! every row is measured by a pure layout engine so a renderer only has to
//! draw frames it is handed.
//!
//! - [`feed`] - pagination state machine, page loader and the controller task
//! - [`images`] - image transport boundary and the coalescing cache
//! - [`layout`] - deterministic cell geometry
//! - [`model`] - reviews, display items and pluralized labels
//! - [`config`] - TOML configuration

pub mod config;
pub mod feed;
pub mod images;
pub mod layout;
pub mod model;
pub mod util;

pub use config::{Config, ConfigError};

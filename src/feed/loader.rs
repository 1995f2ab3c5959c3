use crate::model::{Review, ReviewPage};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from fetching one page of reviews.
///
/// Both variants are transient from the feed's point of view: the page can
/// be requested again and previously loaded items are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The source could not be reached or read
    #[error("Review source unavailable: {0}")]
    SourceUnavailable(String),
    /// The source answered with a payload that does not decode
    #[error("Invalid review data: {0}")]
    BadData(String),
}

/// Boundary to wherever reviews come from.
///
/// `total_count` must be stable across calls against the same underlying
/// data, and a page never holds more than `limit` reviews.
#[async_trait]
pub trait ReviewSource: Send + Sync + 'static {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ReviewPage, FetchError>;
}

/// One call, one page.
///
/// Performs no queuing of its own; the feed guarantees at most one call is
/// outstanding. Pages longer than `limit` are truncated.
#[derive(Clone)]
pub struct PageLoader {
    source: Arc<dyn ReviewSource>,
}

impl PageLoader {
    pub fn new(source: Arc<dyn ReviewSource>) -> Self {
        Self { source }
    }

    pub async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ReviewPage, FetchError> {
        tracing::debug!(offset, limit, "Fetching review page");
        let mut page = self.source.fetch_page(offset, limit).await?;

        if page.items.len() > limit {
            tracing::warn!(
                offset,
                limit,
                received = page.items.len(),
                "Review source returned an oversized page, truncating"
            );
            page.items.truncate(limit);
        }

        Ok(page)
    }
}

/// Reviews held in memory. Pages are slices of the vector.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    reviews: Vec<Review>,
}

impl InMemorySource {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl ReviewSource for InMemorySource {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ReviewPage, FetchError> {
        Ok(slice_page(&self.reviews, offset, limit))
    }
}

/// Reviews read from a JSON document `{"items": [...], "count": N}`.
///
/// The file is re-read on every call so edits show up on the next
/// pull-to-refresh. `count` is taken from the document, not from the number
/// of items in it. An optional latency is slept before each read to mimic a
/// remote source.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    latency: Duration,
}

impl JsonFileSource {
    /// Documents over 32MB are refused unread.
    const MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl ReviewSource for JsonFileSource {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ReviewPage, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let unavailable = |e: std::io::Error| {
            FetchError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        };

        let meta = tokio::fs::metadata(&self.path).await.map_err(unavailable)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(FetchError::BadData(format!(
                "{} is {} bytes (max {})",
                self.path.display(),
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let data = tokio::fs::read(&self.path).await.map_err(unavailable)?;
        let document: ReviewPage =
            serde_json::from_slice(&data).map_err(|e| FetchError::BadData(e.to_string()))?;

        let mut page = slice_page(&document.items, offset, limit);
        page.total_count = document.total_count;
        Ok(page)
    }
}

fn slice_page(reviews: &[Review], offset: usize, limit: usize) -> ReviewPage {
    let start = offset.min(reviews.len());
    let end = offset.saturating_add(limit).min(reviews.len());

    ReviewPage {
        items: reviews[start..end].to_vec(),
        total_count: reviews.len(),
    }
}

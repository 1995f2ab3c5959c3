//! Image fetching and caching.
//!
//! - `fetcher` - the [`ImageFetcher`] transport boundary and its HTTP implementation
//! - `cache` - [`ImageCache`], URL-keyed memoization with request coalescing
//!
//! Decoded images are shared by reference: cloning an [`Image`] is a
//! refcount bump, so the same decoded pixels can sit in the cache and in any
//! number of feed items at once.

mod cache;
mod fetcher;

pub use cache::{CacheStats, ImageCache};
pub use fetcher::{HttpImageFetcher, ImageFetcher, DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT};

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors from fetching or decoding a single image.
///
/// `Clone` because one failed fetch is delivered to every caller that was
/// waiting on the same URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    /// Transport-level failure (DNS, connection, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx HTTP response
    #[error("HTTP error: status {0}")]
    BadStatus(u16),
    /// Bytes arrived but are not a decodable image
    #[error("Invalid image data: {0}")]
    BadData(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Response too large (exceeds {0} bytes)")]
    TooLarge(usize),
}

/// A decoded image.
#[derive(Clone)]
pub struct Image {
    pixels: Arc<image::DynamicImage>,
}

impl Image {
    /// Decode PNG/JPEG/GIF/WebP bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let pixels =
            image::load_from_memory(bytes).map_err(|e| ImageError::BadData(e.to_string()))?;
        Ok(Self::from_dynamic(pixels))
    }

    pub fn from_dynamic(pixels: image::DynamicImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &image::DynamicImage {
        &self.pixels
    }

    /// True if both handles point at the same decoded pixels.
    pub fn same_as(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({}x{})", self.width(), self.height())
    }
}

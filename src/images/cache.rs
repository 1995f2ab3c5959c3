use super::{Image, ImageError, ImageFetcher};
use crate::util::catch_task_panic;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// A fetch-and-decode in progress, awaitable by any number of callers.
type InFlight = Shared<BoxFuture<'static, Result<Image, ImageError>>>;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Decoded images currently held
    pub entries: usize,
    /// URLs with a transport call outstanding
    pub in_flight: usize,
    /// Calls answered straight from the cache
    pub hits: u64,
    /// Calls that started a new transport call
    pub misses: u64,
    /// Calls that joined an outstanding transport call
    pub coalesced: u64,
}

/// URL-keyed image memoization with request coalescing.
///
/// - A cached URL is answered without touching the transport.
/// - Concurrent callers asking for the same uncached URL share one transport
///   call and all receive its result.
/// - Failures are delivered to every waiter but never cached, so a later
///   call for the same URL tries again.
///
/// Entries live for the lifetime of the cache unless a capacity is set, in
/// which case the least recently used image is evicted first.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    fetcher: Arc<dyn ImageFetcher>,
    entries: Mutex<LruCache<Url, Image>>,
    in_flight: Mutex<HashMap<Url, InFlight>>,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

impl ImageCache {
    /// Unbounded cache over `fetcher`.
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self::with_capacity(fetcher, 0)
    }

    /// Cache holding at most `capacity` images; 0 means unbounded.
    pub fn with_capacity(fetcher: Arc<dyn ImageFetcher>, capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                entries: Mutex::new(entries),
                in_flight: Mutex::new(HashMap::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    /// Return the image for `url`, fetching it at most once across all
    /// concurrent callers.
    pub async fn get_or_fetch(&self, url: &Url) -> Result<Image, ImageError> {
        if let Some(image) = self.get(url) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(url = %url, "Image cache hit");
            return Ok(image);
        }

        self.join_in_flight(url).await
    }

    /// Cached image for `url`, without fetching.
    pub fn get(&self, url: &Url) -> Option<Image> {
        lock(&self.inner.entries).get(url).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            in_flight: lock(&self.inner.in_flight).len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
        }
    }

    fn join_in_flight(&self, url: &Url) -> InFlight {
        let mut in_flight = lock(&self.inner.in_flight);

        if let Some(existing) = in_flight.get(url) {
            self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(url = %url, "Joining in-flight image fetch");
            return existing.clone();
        }

        // The owner stores into the cache before leaving the in-flight table,
        // so a fetch that finished after our first lookup is visible here.
        if let Some(image) = lock(&self.inner.entries).get(url).cloned() {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            return futures::future::ready(Ok(image)).boxed().shared();
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(url = %url, "Image cache miss, fetching");

        let fetch = Arc::clone(&self.inner)
            .fetch_and_store(url.clone())
            .boxed()
            .shared();
        in_flight.insert(url.clone(), fetch.clone());
        fetch
    }
}

impl CacheInner {
    async fn fetch_and_store(self: Arc<Self>, url: Url) -> Result<Image, ImageError> {
        let transfer = async {
            match self.fetcher.fetch(&url).await {
                Ok(bytes) => decode_off_thread(bytes).await,
                Err(e) => Err(e),
            }
        };
        let result = match catch_task_panic(transfer).await {
            Ok(result) => result,
            Err(panic_msg) => {
                tracing::error!(url = %url, error = %panic_msg, "Image fetch panicked");
                Err(ImageError::Network(format!("image fetch panicked: {panic_msg}")))
            }
        };

        match &result {
            Ok(image) => {
                lock(&self.entries).put(url.clone(), image.clone());
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Image fetch failed");
            }
        }
        lock(&self.in_flight).remove(&url);

        result
    }
}

async fn decode_off_thread(bytes: Vec<u8>) -> Result<Image, ImageError> {
    tokio::task::spawn_blocking(move || Image::decode(&bytes))
        .await
        .map_err(|e| ImageError::BadData(format!("decoder task failed: {e}")))?
}

/// Lock, recovering from poisoning: every critical section here is a single
/// map operation, so a panicking holder cannot leave the map half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

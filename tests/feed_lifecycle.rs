//! Integration tests for the feed lifecycle: paging, refresh, image
//! population, failures and show-more.
//!
//! Each test runs a real controller task against scripted in-process
//! sources and fetchers, and observes it only through its notifications.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reviewfeed::feed::{
    FeedController, FeedHandle, FeedNotification, FeedSettings, FeedSnapshot, FetchError,
    InMemorySource, PageLoader, ReviewSource, ScrollMetrics,
};
use reviewfeed::images::{ImageCache, ImageError, ImageFetcher};
use reviewfeed::model::{FeedItem, Review, ReviewPage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

// ============================================================================
// Test doubles
// ============================================================================

fn review(i: usize, avatar: Option<&str>, photos: &[&str]) -> Review {
    let parse = |name: &str| Url::parse(&format!("https://cdn.example.com/{name}")).unwrap();
    Review {
        first_name: format!("User{i}"),
        last_name: "Test".to_string(),
        rating: (i % 5) as i32 + 1,
        text: format!("Review number {i}"),
        created: "1 июня".to_string(),
        avatar_url: avatar.map(parse),
        photo_urls: photos.iter().copied().map(parse).collect(),
    }
}

fn plain_reviews(n: usize) -> Vec<Review> {
    (0..n).map(|i| review(i, None, &[])).collect()
}

fn png_bytes() -> Vec<u8> {
    let pixels = image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
    let mut out = Cursor::new(Vec::new());
    pixels
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// In-memory source that records every call and can fail or stall on
/// selected calls (numbered from 0).
struct ScriptedSource {
    inner: InMemorySource,
    calls: Mutex<Vec<(usize, usize)>>,
    fail_calls: Vec<usize>,
    slow_calls: Vec<usize>,
}

impl ScriptedSource {
    fn new(reviews: Vec<Review>) -> Self {
        Self {
            inner: InMemorySource::new(reviews),
            calls: Mutex::new(Vec::new()),
            fail_calls: Vec::new(),
            slow_calls: Vec::new(),
        }
    }

    fn failing(mut self, call: usize) -> Self {
        self.fail_calls.push(call);
        self
    }

    fn slow(mut self, call: usize) -> Self {
        self.slow_calls.push(call);
        self
    }

    fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewSource for ScriptedSource {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<ReviewPage, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((offset, limit));
            calls.len() - 1
        };

        if self.slow_calls.contains(&call) {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        if self.fail_calls.contains(&call) {
            return Err(FetchError::SourceUnavailable("connection reset".into()));
        }
        self.inner.fetch_page(offset, limit).await
    }
}

/// Serves a PNG for every URL after a short delay, counting calls.
struct PngFetcher {
    calls: AtomicUsize,
}

impl PngFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for PngFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        if url.path().contains("missing") {
            return Err(ImageError::BadStatus(404));
        }
        Ok(png_bytes())
    }
}

struct Harness {
    feed: FeedHandle,
    notifications: mpsc::UnboundedReceiver<FeedNotification>,
}

impl Harness {
    fn start(page_size: usize, source: Arc<dyn ReviewSource>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let (tx, notifications) = mpsc::unbounded_channel();
        let controller = FeedController::new(
            FeedSettings {
                page_size,
                prefetch_screens: 2.5,
            },
            PageLoader::new(source),
            ImageCache::new(fetcher),
            tx,
        );
        let (feed, _task) = controller.spawn();
        Self { feed, notifications }
    }

    /// Next notification, failing the test if none arrives in time.
    async fn next(&mut self) -> FeedNotification {
        tokio::time::timeout(Duration::from_secs(5), self.notifications.recv())
            .await
            .expect("timed out waiting for a feed notification")
            .expect("feed controller stopped")
    }

    /// Skip notifications until a snapshot satisfies `done`.
    async fn wait_for(&mut self, done: impl Fn(&FeedSnapshot) -> bool) -> FeedSnapshot {
        loop {
            if let FeedNotification::StateChanged(snapshot) = self.next().await {
                if done(&snapshot) {
                    return snapshot;
                }
            }
        }
    }

    /// Skip notifications until a page has been applied or has failed.
    async fn wait_idle(&mut self) -> FeedSnapshot {
        self.wait_for(|s| !s.page_outstanding).await
    }
}

fn footer_count(snapshot: &FeedSnapshot) -> usize {
    snapshot.items.iter().filter(|item| item.is_footer()).count()
}

// ============================================================================
// Paging
// ============================================================================

#[tokio::test]
async fn test_forty_five_reviews_page_by_twenty() {
    let source = Arc::new(ScriptedSource::new(plain_reviews(45)));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    let expected = [(20, 20, true), (40, 40, true), (45, 45, false)];
    let mut last = None;
    for (count, offset, more) in expected {
        h.feed.request_more().await.unwrap();
        let snapshot = h.wait_idle().await;
        assert_eq!(snapshot.review_count(), count);
        assert_eq!(snapshot.offset, offset);
        assert_eq!(snapshot.should_load_more, more);
        last = Some(snapshot);
    }

    assert_eq!(source.calls(), vec![(0, 20), (20, 20), (40, 20)]);

    // Already exhausted: no loader call, still exactly one footer. The
    // show-more afterwards flushes a notification past the ignored request.
    let first_id = last.unwrap().items[0].as_review().unwrap().id();
    h.feed.request_more().await.unwrap();
    h.feed.show_more(first_id).await.unwrap();
    let snapshot = h.wait_for(|s| s.items[0].as_review().is_some_and(|r| r.is_expanded())).await;

    assert_eq!(source.calls().len(), 3);
    assert_eq!(snapshot.items.len(), 46);
    assert_eq!(footer_count(&snapshot), 1);
    match snapshot.items.last() {
        Some(FeedItem::Footer(footer)) => assert_eq!(footer.label(), "45 отзывов"),
        other => panic!("expected footer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scroll_requests_only_near_end() {
    let source = Arc::new(ScriptedSource::new(plain_reviews(100)));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    h.feed.request_more().await.unwrap();
    h.wait_idle().await;

    // 10000 - 800 - 0 = 9200 left, far more than 2.5 screens
    h.feed
        .scrolled(ScrollMetrics {
            content_height: 10_000.0,
            viewport_height: 800.0,
            target_offset_y: 0.0,
        })
        .await
        .unwrap();
    // 10000 - 800 - 7500 = 1700 left, under 2000
    h.feed
        .scrolled(ScrollMetrics {
            content_height: 10_000.0,
            viewport_height: 800.0,
            target_offset_y: 7_500.0,
        })
        .await
        .unwrap();

    // Only the first page counts as the initial load
    let pending = h.wait_for(|s| s.page_outstanding).await;
    assert!(!pending.is_loading);
    assert_eq!(pending.offset, 20);

    let snapshot = h.wait_for(|s| !s.page_outstanding && s.offset == 40).await;
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.review_count(), 40);
    assert_eq!(source.calls(), vec![(0, 20), (20, 20)]);
}

#[tokio::test]
async fn test_duplicate_requests_while_loading_are_ignored() {
    let source = Arc::new(ScriptedSource::new(plain_reviews(45)).slow(0));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    for _ in 0..5 {
        h.feed.request_more().await.unwrap();
    }
    let snapshot = h.wait_idle().await;

    assert_eq!(snapshot.review_count(), 20);
    assert_eq!(source.calls(), vec![(0, 20)]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_page_then_retry() {
    let source = Arc::new(ScriptedSource::new(plain_reviews(45)).failing(1));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    h.feed.request_more().await.unwrap();
    h.wait_idle().await;

    h.feed.request_more().await.unwrap();
    let failed = h.wait_idle().await;
    assert_eq!(failed.review_count(), 20);
    assert!(failed.should_load_more);
    assert!(failed.last_error.is_some());

    match h.next().await {
        FeedNotification::LoadFailed { message } => {
            assert!(message.contains("connection reset"), "{message}");
        }
        other => panic!("expected LoadFailed, got {other:?}"),
    }

    h.feed.request_more().await.unwrap();
    let recovered = h.wait_idle().await;
    assert_eq!(recovered.review_count(), 40);
    assert_eq!(recovered.offset, 40);
    assert!(recovered.last_error.is_none());

    // The failed page was asked for again at the same offset
    assert_eq!(source.calls(), vec![(0, 20), (20, 20), (20, 20)]);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_drops_results_of_previous_generation() {
    // First call stalls; the refresh issued meanwhile answers first
    let source = Arc::new(ScriptedSource::new(plain_reviews(45)).slow(0));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    h.feed.request_more().await.unwrap();
    while source.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    h.feed.refresh().await.unwrap();

    let snapshot = h.wait_for(|s| s.generation == 1 && !s.page_outstanding).await;
    assert_eq!(snapshot.review_count(), 20);

    // Let the stalled call finish; its page must not be appended
    tokio::time::sleep(Duration::from_secs(1)).await;
    let ids: Vec<_> = snapshot
        .items
        .iter()
        .filter_map(FeedItem::as_review)
        .map(|r| r.id())
        .collect();
    h.feed.show_more(ids[0]).await.unwrap();
    let after = h.wait_for(|s| s.items[0].as_review().is_some_and(|r| r.is_expanded())).await;

    assert_eq!(after.generation, 1);
    assert_eq!(after.review_count(), 20);
    assert_eq!(after.offset, 20);
    assert_eq!(source.calls(), vec![(0, 20), (0, 20)]);
}

#[tokio::test]
async fn test_refresh_after_exhaustion_starts_over() {
    let source = Arc::new(ScriptedSource::new(plain_reviews(5)));
    let mut h = Harness::start(20, source.clone(), PngFetcher::new());

    h.feed.request_more().await.unwrap();
    let exhausted = h.wait_idle().await;
    assert_eq!(footer_count(&exhausted), 1);

    h.feed.refresh().await.unwrap();
    let reset = h.wait_for(|s| s.generation == 1).await;
    assert!(reset.items.is_empty());
    assert!(reset.is_loading);

    let reloaded = h.wait_idle().await;
    assert_eq!(reloaded.review_count(), 5);
    assert_eq!(footer_count(&reloaded), 1);
    match reloaded.items.last() {
        Some(FeedItem::Footer(footer)) => assert_eq!(footer.label(), "5 отзывов"),
        other => panic!("expected footer, got {other:?}"),
    }
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn test_image_slots_are_filled() {
    let reviews = vec![
        review(0, Some("a0.png"), &["p0.jpg", "p1.jpg"]),
        review(1, None, &["p2.jpg"]),
        review(2, Some("a2.png"), &[]),
    ];
    let source = Arc::new(ScriptedSource::new(reviews));
    let mut h = Harness::start(20, source, PngFetcher::new());

    h.feed.request_more().await.unwrap();
    let snapshot = h
        .wait_for(|s| {
            s.items.iter().filter_map(FeedItem::as_review).all(|r| {
                r.avatar().is_some() == r.avatar_url().is_some()
                    && r.photos().iter().all(Option::is_some)
            }) && s.review_count() == 3
        })
        .await;

    let second = snapshot.items[1].as_review().unwrap();
    assert!(second.avatar().is_none());
    assert_eq!(second.photos().len(), 1);
}

#[tokio::test]
async fn test_shared_image_url_fetched_once() {
    let reviews: Vec<_> = (0..10)
        .map(|i| review(i, Some("same-avatar.png"), &[]))
        .collect();
    let fetcher = PngFetcher::new();
    let mut h = Harness::start(20, Arc::new(ScriptedSource::new(reviews)), fetcher.clone());

    h.feed.request_more().await.unwrap();
    h.wait_for(|s| {
        s.review_count() == 10
            && s
                .items
                .iter()
                .filter_map(FeedItem::as_review)
                .all(|r| r.avatar().is_some())
    })
    .await;

    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_failed_image_leaves_slot_empty() {
    let reviews = vec![review(0, Some("missing.png"), &["ok.jpg", "missing.jpg"])];
    let mut h = Harness::start(20, Arc::new(ScriptedSource::new(reviews)), PngFetcher::new());

    h.feed.request_more().await.unwrap();
    let snapshot = h
        .wait_for(|s| {
            s.items
                .first()
                .and_then(FeedItem::as_review)
                .is_some_and(|r| r.photos()[0].is_some())
        })
        .await;

    // Give the failed fetches time to finish; nothing else may change
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.notifications.try_recv().is_err());

    let item = snapshot.items[0].as_review().unwrap();
    assert!(item.avatar().is_none());
    assert!(item.photos()[1].is_none());
    assert_eq!(item.photos().len(), 2);
}

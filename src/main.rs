use anyhow::{Context, Result};
use clap::Parser;
use reviewfeed::feed::{
    FeedController, FeedNotification, FeedSnapshot, JsonFileSource, PageLoader, ScrollMetrics,
};
use reviewfeed::images::{HttpImageFetcher, ImageCache};
use reviewfeed::layout::{content_height, layout_item, MonospaceMeasurer};
use reviewfeed::model::FeedItem;
use reviewfeed::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Page loads retried after a failure before giving up.
const MAX_RETRIES: usize = 2;
/// Images still arriving after this much silence are not waited for.
const IMAGE_SETTLE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(
    name = "reviewfeed",
    about = "Page through a review feed and print each row's layout"
)]
struct Args {
    /// JSON file of the form {"items": [...], "count": N}
    #[arg(long, value_name = "FILE")]
    reviews: PathBuf,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cell width in points
    #[arg(long, value_name = "PT", default_value_t = 390.0)]
    width: f64,

    /// Viewport height in points
    #[arg(long, value_name = "PT", default_value_t = 844.0)]
    viewport: f64,

    /// Stop after this many pages even if more are available
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let reviews_path = args
        .reviews
        .canonicalize()
        .with_context(|| format!("Failed to resolve review file: {}", args.reviews.display()))?;
    if !std::fs::metadata(&reviews_path)?.is_file() {
        anyhow::bail!("Review path must be a regular file");
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("reviewfeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = HttpImageFetcher::new(client)
        .with_timeout(config.image_timeout())
        .with_max_bytes(config.max_image_bytes);
    let cache = ImageCache::with_capacity(Arc::new(fetcher), config.image_cache_capacity);

    let source = JsonFileSource::new(reviews_path).with_latency(config.source_latency());

    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let controller = FeedController::new(
        config.feed_settings(),
        PageLoader::new(Arc::new(source)),
        cache.clone(),
        notify_tx,
    );
    let (feed, task) = controller.spawn();

    let measurer = MonospaceMeasurer::new();
    let mut latest: Option<FeedSnapshot> = None;
    let mut was_outstanding = false;
    let mut pages = 0;
    let mut failures = 0;

    feed.request_more().await?;

    while let Some(notification) = notifications.recv().await {
        match notification {
            FeedNotification::LoadFailed { message } => {
                failures += 1;
                if failures > MAX_RETRIES {
                    anyhow::bail!("Failed to load reviews: {message}");
                }
                tracing::warn!(attempt = failures, error = %message, "Retrying page load");
                feed.request_more().await?;
            }
            FeedNotification::StateChanged(snapshot) => {
                let page_done = was_outstanding
                    && !snapshot.page_outstanding
                    && snapshot.last_error.is_none();
                was_outstanding = snapshot.page_outstanding;

                if page_done {
                    pages += 1;
                    let exhausted = !snapshot.should_load_more;
                    let capped = args.max_pages.is_some_and(|max| pages >= max);

                    if exhausted || capped {
                        latest = Some(snapshot);
                        break;
                    }

                    // Fling straight to the bottom of what is loaded
                    let height = content_height(&snapshot.items, args.width, &measurer);
                    feed.scrolled(ScrollMetrics {
                        content_height: height,
                        viewport_height: args.viewport,
                        target_offset_y: (height - args.viewport).max(0.0),
                    })
                    .await?;
                }
                latest = Some(snapshot);
            }
        }
    }

    // Give in-flight images a moment to land
    while let Ok(Some(notification)) = tokio::time::timeout(IMAGE_SETTLE, notifications.recv()).await {
        if let FeedNotification::StateChanged(snapshot) = notification {
            latest = Some(snapshot);
        }
    }

    drop(feed);
    task.await.context("Feed controller task failed")?;

    let Some(snapshot) = latest else {
        println!("No reviews loaded");
        return Ok(());
    };

    print_feed(&snapshot, args.width, &measurer);

    let stats = cache.stats();
    println!();
    println!(
        "{} pages, {} rows, {:.0}pt total; images: {} cached, {} fetched, {} joined, {} hits",
        pages,
        snapshot.items.len(),
        content_height(&snapshot.items, args.width, &measurer),
        stats.entries,
        stats.misses,
        stats.coalesced,
        stats.hits
    );

    Ok(())
}

fn print_feed(snapshot: &FeedSnapshot, width: f64, measurer: &MonospaceMeasurer) {
    for (i, item) in snapshot.items.iter().enumerate() {
        let height = layout_item(item, width, measurer).height();
        match item {
            FeedItem::Review(review) => {
                let photos_loaded = review.photos().iter().filter(|p| p.is_some()).count();
                println!(
                    "{:>4}  {:<28} {}  {:>4.0}pt  avatar {}  photos {}/{}",
                    i + 1,
                    review.username(),
                    review.rating(),
                    height,
                    if review.avatar().is_some() { "yes" } else { "no " },
                    photos_loaded,
                    review.photos().len()
                );
            }
            FeedItem::Footer(footer) => {
                println!("      {:<28} {:>9.0}pt", footer.label(), height);
            }
        }
    }
}

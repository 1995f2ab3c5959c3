use super::FeedEvent;
use crate::images::ImageCache;
use crate::model::ReviewItem;
use tokio::sync::mpsc;

/// Fills the image slots of freshly created review items.
///
/// Every slot gets its own task; completions arrive on the controller's event
/// channel in whatever order the fetches finish. A failed slot stays empty
/// for good: the failure is logged and nothing else happens.
#[derive(Clone)]
pub struct ImagePopulator {
    cache: ImageCache,
    events: mpsc::Sender<FeedEvent>,
}

impl ImagePopulator {
    pub fn new(cache: ImageCache, events: mpsc::Sender<FeedEvent>) -> Self {
        Self { cache, events }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Start fetching every slot of `item`. Returns the number of tasks
    /// spawned; never waits for any of them.
    pub fn populate(&self, generation: u64, item: &ReviewItem) -> usize {
        let mut spawned = 0;

        for (slot, url) in item.slots() {
            let cache = self.cache.clone();
            let events = self.events.clone();
            let item_id = item.id();
            let url = url.clone();

            tokio::spawn(async move {
                match cache.get_or_fetch(&url).await {
                    Ok(image) => {
                        let event = FeedEvent::ImageLoaded {
                            generation,
                            item_id,
                            slot,
                            image,
                        };
                        if events.send(event).await.is_err() {
                            tracing::trace!(%item_id, %slot, "Feed closed before image arrived");
                        }
                    }
                    Err(e) => {
                        tracing::debug!(
                            %item_id,
                            %slot,
                            url = %url,
                            error = %e,
                            "Image slot left empty"
                        );
                    }
                }
            });
            spawned += 1;
        }

        spawned
    }
}

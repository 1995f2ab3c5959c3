//! The task that owns the feed.
//!
//! All state changes happen here, one message at a time. Page loads and image
//! fetches run on their own tasks and report back over the event channel;
//! the controller itself never awaits a fetch.

use super::populator::ImagePopulator;
use super::state::{FeedSnapshot, FeedState, PageOutcome, PageRequest, ScrollMetrics};
use super::state::{DEFAULT_PAGE_SIZE, DEFAULT_PREFETCH_SCREENS};
use super::{FetchError, PageLoader};
use crate::images::{Image, ImageCache};
use crate::model::{ImageSlot, ItemId, ReviewPage};
use crate::util::catch_task_panic;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the completion channel and of the command channel.
const CHANNEL_CAPACITY: usize = 32;

/// Completions from background tasks.
#[derive(Debug)]
pub enum FeedEvent {
    /// A page request finished.
    ///
    /// Fields:
    /// - `generation`: The generation the request was issued under
    /// - `result`: The page or why it could not be loaded
    PageLoaded {
        generation: u64,
        result: Result<ReviewPage, FetchError>,
    },
    /// One image slot resolved.
    ImageLoaded {
        generation: u64,
        item_id: ItemId,
        slot: ImageSlot,
        image: Image,
    },
}

/// Requests from whatever displays the feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedCommand {
    /// Load the next page if one can be loaded now.
    RequestMore,
    /// The scroll target moved; loads the next page when close to the end.
    Scrolled(ScrollMetrics),
    /// Pull-to-refresh: drop everything and start over.
    Refresh,
    /// Lift the line limit of one item.
    ShowMore(ItemId),
}

/// Messages to observers of the feed.
#[derive(Debug, Clone)]
pub enum FeedNotification {
    /// Something visible changed.
    StateChanged(FeedSnapshot),
    /// A page could not be loaded. Sent once per failure; the next
    /// `RequestMore` retries the same page.
    LoadFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    pub page_size: usize,
    /// Viewport heights of content left below the scroll target at which the
    /// next page is requested.
    pub prefetch_screens: f64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_screens: DEFAULT_PREFETCH_SCREENS,
        }
    }
}

/// Returned by [`FeedHandle`] once the controller task has stopped.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Feed controller has stopped")]
pub struct FeedClosed;

/// Cloneable sender of [`FeedCommand`]s to a running controller.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
}

impl FeedHandle {
    pub async fn send(&self, command: FeedCommand) -> Result<(), FeedClosed> {
        self.commands.send(command).await.map_err(|_| FeedClosed)
    }

    pub async fn request_more(&self) -> Result<(), FeedClosed> {
        self.send(FeedCommand::RequestMore).await
    }

    pub async fn scrolled(&self, metrics: ScrollMetrics) -> Result<(), FeedClosed> {
        self.send(FeedCommand::Scrolled(metrics)).await
    }

    pub async fn refresh(&self) -> Result<(), FeedClosed> {
        self.send(FeedCommand::Refresh).await
    }

    pub async fn show_more(&self, id: ItemId) -> Result<(), FeedClosed> {
        self.send(FeedCommand::ShowMore(id)).await
    }
}

/// Sequencer for the review feed.
///
/// Owns the [`FeedState`] and is the only code that mutates it. Runs until
/// every [`FeedHandle`] has been dropped.
pub struct FeedController {
    state: FeedState,
    prefetch_screens: f64,
    loader: PageLoader,
    populator: ImagePopulator,
    event_tx: mpsc::Sender<FeedEvent>,
    event_rx: mpsc::Receiver<FeedEvent>,
    notifications: mpsc::UnboundedSender<FeedNotification>,
}

impl FeedController {
    pub fn new(
        settings: FeedSettings,
        loader: PageLoader,
        cache: ImageCache,
        notifications: mpsc::UnboundedSender<FeedNotification>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            state: FeedState::new(settings.page_size),
            prefetch_screens: settings.prefetch_screens,
            loader,
            populator: ImagePopulator::new(cache, event_tx.clone()),
            event_tx,
            event_rx,
            notifications,
        }
    }

    /// Run the controller on its own task.
    pub fn spawn(self) -> (FeedHandle, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(command_rx));
        (FeedHandle { commands }, task)
    }

    /// Process commands and completions until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>) {
        tracing::debug!(page_size = self.state.limit(), "Feed controller started");

        loop {
            // Drain completions first so a burst of commands cannot starve them
            while let Ok(event) = self.event_rx.try_recv() {
                self.handle_event(event);
            }

            tokio::select! {
                biased;

                maybe_command = commands.recv() => match maybe_command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },

                // The controller holds a sender, so this never yields None
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }
            }
        }

        tracing::debug!(
            generation = self.state.generation(),
            items = self.state.items().len(),
            "Feed controller stopped"
        );
    }

    fn handle_command(&mut self, command: FeedCommand) {
        match command {
            FeedCommand::RequestMore => {
                if let Some(request) = self.state.request_more() {
                    self.dispatch(request);
                }
            }
            FeedCommand::Scrolled(metrics) => {
                if let Some(request) = self.state.on_scroll(metrics, self.prefetch_screens) {
                    tracing::trace!(remaining = metrics.remaining(), "Prefetching next page");
                    self.dispatch(request);
                }
            }
            FeedCommand::Refresh => {
                let request = self.state.refresh();
                tracing::debug!(generation = request.generation, "Feed refreshed");
                self.dispatch(request);
            }
            FeedCommand::ShowMore(id) => {
                if self.state.show_more(id) {
                    self.notify_changed();
                }
            }
        }
    }

    fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::PageLoaded { generation, result } => {
                match self.state.apply_page(generation, result) {
                    PageOutcome::Stale => {
                        tracing::debug!(
                            generation,
                            current = self.state.generation(),
                            "Dropping stale page"
                        );
                    }
                    PageOutcome::Applied {
                        new_items,
                        exhausted,
                    } => {
                        tracing::debug!(
                            generation,
                            received = new_items.len(),
                            offset = self.state.offset(),
                            exhausted,
                            "Page applied"
                        );
                        for item in &new_items {
                            self.populator.populate(generation, item);
                        }
                        self.notify_changed();
                    }
                    PageOutcome::Failed(e) => {
                        tracing::warn!(
                            generation,
                            offset = self.state.offset(),
                            error = %e,
                            "Page load failed"
                        );
                        self.notify_changed();
                        self.notify(FeedNotification::LoadFailed {
                            message: e.to_string(),
                        });
                    }
                }
            }
            FeedEvent::ImageLoaded {
                generation,
                item_id,
                slot,
                image,
            } => {
                if self.state.apply_image(generation, item_id, slot, image) {
                    self.notify_changed();
                } else {
                    tracing::debug!(generation, %item_id, %slot, "Dropping image for stale or absent item");
                }
            }
        }
    }

    /// Load `request` on a background task. The state has already marked it
    /// outstanding.
    fn dispatch(&self, request: PageRequest) {
        self.notify_changed();

        let loader = self.loader.clone();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result =
                match catch_task_panic(loader.fetch_page(request.offset, request.limit)).await {
                    Ok(result) => result,
                    Err(panic_msg) => {
                        tracing::error!(error = %panic_msg, "Page load task panicked");
                        Err(FetchError::SourceUnavailable(format!(
                            "page load panicked: {panic_msg}"
                        )))
                    }
                };

            let event = FeedEvent::PageLoaded {
                generation: request.generation,
                result,
            };
            if tx.send(event).await.is_err() {
                tracing::trace!(generation = request.generation, "Feed closed before page arrived");
            }
        });
    }

    fn notify_changed(&self) {
        self.notify(FeedNotification::StateChanged(self.state.snapshot()));
    }

    fn notify(&self, notification: FeedNotification) {
        // Nobody listening is fine; the feed keeps working headless
        let _ = self.notifications.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ReviewSource;
    use crate::images::{ImageError, ImageFetcher};
    use async_trait::async_trait;
    use std::sync::Arc;
    use url::Url;

    struct PanickingSource;

    #[async_trait]
    impl ReviewSource for PanickingSource {
        async fn fetch_page(&self, _offset: usize, _limit: usize) -> Result<ReviewPage, FetchError> {
            panic!("source exploded");
        }
    }

    struct NoImages;

    #[async_trait]
    impl ImageFetcher for NoImages {
        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, ImageError> {
            Err(ImageError::Network("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_panicking_source_becomes_load_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = FeedController::new(
            FeedSettings::default(),
            PageLoader::new(Arc::new(PanickingSource)),
            ImageCache::new(Arc::new(NoImages)),
            tx,
        );
        let (handle, _task) = controller.spawn();
        handle.request_more().await.unwrap();

        loop {
            match rx.recv().await.unwrap() {
                FeedNotification::LoadFailed { message } => {
                    assert!(message.contains("source exploded"), "{message}");
                    break;
                }
                FeedNotification::StateChanged(_) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_controller_stops_when_handles_dropped() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let controller = FeedController::new(
            FeedSettings::default(),
            PageLoader::new(Arc::new(PanickingSource)),
            ImageCache::new(Arc::new(NoImages)),
            tx,
        );
        let (handle, task) = controller.spawn();
        drop(handle);
        task.await.unwrap();
    }
}

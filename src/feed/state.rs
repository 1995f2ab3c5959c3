use super::FetchError;
use crate::images::Image;
use crate::model::{FeedItem, FooterItem, ImageSlot, ItemId, ReviewItem, ReviewPage};
use std::collections::HashMap;
use std::sync::Arc;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 22;
/// Prefetch distance, in viewport heights, used when none is configured.
pub const DEFAULT_PREFETCH_SCREENS: f64 = 2.5;

/// A page the feed wants loaded. Carries the generation it was issued under
/// so the completion can be matched against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub offset: usize,
    pub limit: usize,
}

/// Scroll position reported by whatever displays the feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub content_height: f64,
    pub viewport_height: f64,
    /// Where the scroll is heading to, not where it is now.
    pub target_offset_y: f64,
}

impl ScrollMetrics {
    /// Distance left below the bottom edge of the viewport.
    pub fn remaining(&self) -> f64 {
        self.content_height - self.viewport_height - self.target_offset_y
    }

    /// True when less than `screens` viewports of content remain.
    pub fn is_near_end(&self, screens: f64) -> bool {
        self.remaining() <= screens * self.viewport_height
    }
}

/// What applying a page completion did.
#[derive(Debug)]
pub enum PageOutcome {
    /// Tagged with an older generation; nothing changed.
    Stale,
    /// Items were appended. `new_items` are copies of what was appended,
    /// still without images.
    Applied {
        new_items: Vec<ReviewItem>,
        exhausted: bool,
    },
    /// The page failed; the feed is eligible to request it again.
    Failed(FetchError),
}

/// Immutable view of the feed handed to observers.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub generation: u64,
    pub items: Arc<Vec<FeedItem>>,
    pub offset: usize,
    pub total_count: Option<usize>,
    pub should_load_more: bool,
    pub is_loading: bool,
    pub page_outstanding: bool,
    pub last_error: Option<FetchError>,
}

impl FeedSnapshot {
    pub fn review_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_footer()).count()
    }

    pub fn has_footer(&self) -> bool {
        self.items.last().is_some_and(FeedItem::is_footer)
    }
}

/// Pagination state machine of the review feed.
///
/// Single-owner and synchronous: it never performs I/O. It hands out
/// [`PageRequest`]s and accepts their completions, and it is the only place
/// items are created, mutated or discarded.
///
/// At most one page request is outstanding at a time: `should_load_more`
/// drops to false when a request is issued and only rises again on a
/// failure or on a successful page that leaves more to load.
///
/// `is_loading` covers only the first page of a generation. Later pages
/// are tracked by `page_outstanding`.
///
/// Items sit behind an `Arc` so a snapshot shares them until the next write.
#[derive(Debug)]
pub struct FeedState {
    items: Arc<Vec<FeedItem>>,
    index: HashMap<ItemId, usize>,
    offset: usize,
    limit: usize,
    total_count: Option<usize>,
    should_load_more: bool,
    is_loading: bool,
    page_outstanding: bool,
    last_error: Option<FetchError>,
    generation: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedState {
    /// `limit` is clamped to at least one review per page.
    pub fn new(limit: usize) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            index: HashMap::new(),
            offset: 0,
            limit: limit.max(1),
            total_count: None,
            should_load_more: true,
            is_loading: true,
            page_outstanding: false,
            last_error: None,
            generation: 0,
        }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&ReviewItem> {
        self.index
            .get(&id)
            .and_then(|&i| self.items.get(i))
            .and_then(FeedItem::as_review)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Last total reported by the source; `None` before the first page.
    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    pub fn should_load_more(&self) -> bool {
        self.should_load_more
    }

    /// True until the first page of the current generation has an outcome.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// True while any page request of the current generation is unanswered.
    pub fn page_outstanding(&self) -> bool {
        self.page_outstanding
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_footer(&self) -> bool {
        self.items.last().is_some_and(FeedItem::is_footer)
    }

    /// Claim the next page.
    ///
    /// Returns `None` and changes nothing while a page is outstanding or the
    /// source is exhausted.
    pub fn request_more(&mut self) -> Option<PageRequest> {
        if !self.should_load_more {
            return None;
        }

        self.should_load_more = false;
        self.page_outstanding = true;

        Some(PageRequest {
            generation: self.generation,
            offset: self.offset,
            limit: self.limit,
        })
    }

    /// Claim the next page if the scroll target is close enough to the end.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, screens: f64) -> Option<PageRequest> {
        if metrics.is_near_end(screens) {
            self.request_more()
        } else {
            None
        }
    }

    /// Throw everything away and start a new generation, returning the
    /// request for its first page. Completions from earlier generations are
    /// ignored from now on.
    pub fn refresh(&mut self) -> PageRequest {
        self.items = Arc::new(Vec::new());
        self.index.clear();
        self.offset = 0;
        self.total_count = None;
        self.last_error = None;
        self.generation += 1;
        self.should_load_more = false;
        self.is_loading = true;
        self.page_outstanding = true;

        PageRequest {
            generation: self.generation,
            offset: 0,
            limit: self.limit,
        }
    }

    /// Apply the completion of a page request issued under `generation`.
    pub fn apply_page(
        &mut self,
        generation: u64,
        result: Result<ReviewPage, FetchError>,
    ) -> PageOutcome {
        if generation != self.generation {
            return PageOutcome::Stale;
        }

        self.is_loading = false;
        self.page_outstanding = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.should_load_more = true;
                self.last_error = Some(e.clone());
                return PageOutcome::Failed(e);
            }
        };

        let items = Arc::make_mut(&mut self.items);
        let mut new_items = Vec::with_capacity(page.items.len());
        for review in &page.items {
            let item = ReviewItem::from_review(review);
            self.index.insert(item.id(), items.len());
            new_items.push(item.clone());
            items.push(FeedItem::Review(item));
        }

        self.offset += page.items.len();
        self.total_count = Some(page.total_count);
        self.last_error = None;
        // An empty page ends pagination even if the count says otherwise,
        // or a short source would be asked for the same offset forever.
        self.should_load_more = !page.items.is_empty() && self.offset < page.total_count;

        if !self.should_load_more && !self.has_footer() {
            Arc::make_mut(&mut self.items)
                .push(FeedItem::Footer(FooterItem::new(page.total_count)));
        }

        PageOutcome::Applied {
            new_items,
            exhausted: !self.should_load_more,
        }
    }

    /// Write a fetched image into one slot of one item.
    ///
    /// Returns false without touching anything when the generation is stale,
    /// the item is gone, or the slot does not exist.
    pub fn apply_image(
        &mut self,
        generation: u64,
        id: ItemId,
        slot: ImageSlot,
        image: Image,
    ) -> bool {
        if generation != self.generation {
            return false;
        }

        match self.review_mut(id) {
            Some(item) => item.fill_slot(slot, image),
            None => false,
        }
    }

    /// Lift the line limit of one item. Returns true if anything changed.
    pub fn show_more(&mut self, id: ItemId) -> bool {
        if !self.item(id).is_some_and(|item| !item.is_expanded()) {
            return false;
        }
        self.review_mut(id).is_some_and(ReviewItem::expand)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            generation: self.generation,
            items: Arc::clone(&self.items),
            offset: self.offset,
            total_count: self.total_count,
            should_load_more: self.should_load_more,
            is_loading: self.is_loading,
            page_outstanding: self.page_outstanding,
            last_error: self.last_error.clone(),
        }
    }

    fn review_mut(&mut self, id: ItemId) -> Option<&mut ReviewItem> {
        let &i = self.index.get(&id)?;
        if !matches!(self.items.get(i), Some(FeedItem::Review(_))) {
            return None;
        }
        match Arc::make_mut(&mut self.items).get_mut(i) {
            Some(FeedItem::Review(item)) => Some(item),
            _ => None,
        }
    }
}

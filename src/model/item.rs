use super::{RatingGlyph, Review};
use crate::images::Image;
use crate::util::strip_control_chars;
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Lines of review text shown before the "show more" control appears.
pub const DEFAULT_MAX_LINES: usize = 3;

/// Stable identity of a [`ReviewItem`] for the lifetime of one feed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One addressable image position within a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    Avatar,
    Photo(usize),
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::Avatar => f.write_str("avatar"),
            ImageSlot::Photo(i) => write!(f, "photo[{i}]"),
        }
    }
}

/// Display item for one review.
///
/// Text fields are derived once at creation. Image slots start empty and are
/// filled in place as fetches complete; the photo slot count is fixed to the
/// number of photo URLs and never changes afterwards.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    id: ItemId,
    text: String,
    username: String,
    created: String,
    rating: RatingGlyph,
    avatar_url: Option<Url>,
    photo_urls: Vec<Url>,
    avatar: Option<Image>,
    photos: Vec<Option<Image>>,
    max_lines: usize,
}

impl ReviewItem {
    pub fn from_review(review: &Review) -> Self {
        let username = format!("{} {}", review.first_name.trim(), review.last_name.trim());

        Self {
            id: ItemId::new(),
            text: strip_control_chars(&review.text).into_owned(),
            username: strip_control_chars(username.trim()).into_owned(),
            created: strip_control_chars(&review.created).into_owned(),
            rating: RatingGlyph::new(review.rating),
            avatar_url: review.avatar_url.clone(),
            photo_urls: review.photo_urls.clone(),
            avatar: None,
            photos: vec![None; review.photo_urls.len()],
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created(&self) -> &str {
        &self.created
    }

    pub fn rating(&self) -> RatingGlyph {
        self.rating
    }

    pub fn avatar_url(&self) -> Option<&Url> {
        self.avatar_url.as_ref()
    }

    pub fn photo_urls(&self) -> &[Url] {
        &self.photo_urls
    }

    /// `None` until the avatar arrives; renderers show a placeholder.
    pub fn avatar(&self) -> Option<&Image> {
        self.avatar.as_ref()
    }

    /// Always the same length as [`photo_urls`](Self::photo_urls).
    pub fn photos(&self) -> &[Option<Image>] {
        &self.photos
    }

    /// 0 means unlimited.
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    pub fn is_expanded(&self) -> bool {
        self.max_lines == 0
    }

    /// Every slot (avatar if any, plus each photo) the populator must fill.
    pub fn slots(&self) -> impl Iterator<Item = (ImageSlot, &Url)> {
        self.avatar_url
            .iter()
            .map(|url| (ImageSlot::Avatar, url))
            .chain(
                self.photo_urls
                    .iter()
                    .enumerate()
                    .map(|(i, url)| (ImageSlot::Photo(i), url)),
            )
    }

    /// Write `image` into exactly one slot.
    ///
    /// Returns false, leaving the item untouched, when the slot does not exist
    /// (no avatar URL, or a photo index past the end).
    pub fn fill_slot(&mut self, slot: ImageSlot, image: Image) -> bool {
        match slot {
            ImageSlot::Avatar if self.avatar_url.is_some() => {
                self.avatar = Some(image);
                true
            }
            ImageSlot::Avatar => false,
            ImageSlot::Photo(i) => match self.photos.get_mut(i) {
                Some(photo) => {
                    *photo = Some(image);
                    true
                }
                None => false,
            },
        }
    }

    /// Lift the line limit. Returns true only on the first call.
    pub fn expand(&mut self) -> bool {
        if self.is_expanded() {
            return false;
        }
        self.max_lines = 0;
        true
    }
}

/// Trailing "N отзывов" row, appended once pagination is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterItem {
    total_count: usize,
    label: String,
}

impl FooterItem {
    pub fn new(total_count: usize) -> Self {
        Self {
            total_count,
            label: review_count_label(total_count),
        }
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A row in the feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Review(ReviewItem),
    Footer(FooterItem),
}

impl FeedItem {
    pub fn as_review(&self) -> Option<&ReviewItem> {
        match self {
            FeedItem::Review(item) => Some(item),
            FeedItem::Footer(_) => None,
        }
    }

    pub fn is_footer(&self) -> bool {
        matches!(self, FeedItem::Footer(_))
    }
}

/// Russian noun form agreeing with `count`: отзыв / отзыва / отзывов.
pub fn review_noun(count: usize) -> &'static str {
    if (11..=14).contains(&(count % 100)) {
        return "отзывов";
    }

    match count % 10 {
        1 => "отзыв",
        2..=4 => "отзыва",
        _ => "отзывов",
    }
}

/// `"45 отзывов"`, `"21 отзыв"`, ...
pub fn review_count_label(count: usize) -> String {
    format!("{} {}", count, review_noun(count))
}

//! Feed data model.
//!
//! [`Review`] is what a source hands us; [`FeedItem`] is what the feed
//! displays. Review items are derived once from a review and afterwards only
//! change through image slot writes and the one-way "show more" expand.

mod gallery;
mod item;
mod rating;
mod review;

pub use gallery::PhotoGallery;
pub use item::{
    review_count_label, review_noun, FeedItem, FooterItem, ImageSlot, ItemId, ReviewItem,
    DEFAULT_MAX_LINES,
};
pub use rating::RatingGlyph;
pub use review::{Review, ReviewPage};

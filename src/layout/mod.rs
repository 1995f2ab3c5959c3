//! Cell geometry for feed rows.
//!
//! Layout is a pure function of the item, the available width and a
//! [`TextMeasurer`]. Nothing is cached here: callers that virtualize the list
//! may cache heights themselves, which is sound because identical inputs
//! always produce identical frames.
//!
//! - [`layout_review`] - review cell frames, including the "show more" rule
//! - [`layout_footer`] - the trailing review-count row
//! - [`MonospaceMeasurer`] - fixed-pitch measurer for headless use

mod footer;
mod geometry;
mod measure;
mod review;

pub use footer::{layout_footer, FooterLayout};
pub use geometry::{Insets, Point, Rect, Size};
pub use measure::{FontMetrics, MonospaceMeasurer, TextMeasurer, TextStyle};
pub use review::{
    layout_review, ReviewLayout, AVATAR_SIZE, INSETS, MAX_PHOTOS, PHOTO_SIZE, SHOW_MORE_TEXT,
};

use crate::model::FeedItem;

/// The rating glyph is drawn as an image of five 16pt stars with 1pt gaps.
pub const RATING_SIZE: Size = Size::new(84.0, 16.0);

/// Layout of any feed row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellLayout {
    Review(ReviewLayout),
    Footer(FooterLayout),
}

impl CellLayout {
    pub fn height(&self) -> f64 {
        match self {
            CellLayout::Review(layout) => layout.height,
            CellLayout::Footer(layout) => layout.height,
        }
    }
}

pub fn layout_item<M>(item: &FeedItem, max_width: f64, measurer: &M) -> CellLayout
where
    M: TextMeasurer + ?Sized,
{
    match item {
        FeedItem::Review(review) => CellLayout::Review(layout_review(review, max_width, measurer)),
        FeedItem::Footer(footer) => CellLayout::Footer(layout_footer(footer, max_width, measurer)),
    }
}

/// Total height of `items` stacked at `max_width`.
pub fn content_height<M>(items: &[FeedItem], max_width: f64, measurer: &M) -> f64
where
    M: TextMeasurer + ?Sized,
{
    items
        .iter()
        .map(|item| layout_item(item, max_width, measurer).height())
        .sum()
}

use super::{Insets, Rect, Size, TextMeasurer, TextStyle, RATING_SIZE};
use crate::model::ReviewItem;

// ============================================================================
// Sizes
// ============================================================================

pub const INSETS: Insets = Insets {
    top: 9.0,
    left: 12.0,
    bottom: 9.0,
    right: 12.0,
};

pub const AVATAR_SIZE: Size = Size::new(36.0, 36.0);
pub const PHOTO_SIZE: Size = Size::new(55.0, 66.0);
/// Thumbnails laid out per row; further photos are not laid out.
pub const MAX_PHOTOS: usize = 5;

/// Label of the control that lifts the line limit.
pub const SHOW_MORE_TEXT: &str = "Показать полностью...";

// ============================================================================
// Spacing
// ============================================================================

/// Horizontal, avatar to the header column.
pub const AVATAR_TO_USERNAME: f64 = 10.0;
pub const USERNAME_TO_RATING: f64 = 6.0;
/// Header to text when there are no photos.
pub const RATING_TO_TEXT: f64 = 6.0;
pub const RATING_TO_PHOTOS: f64 = 10.0;
/// Horizontal, between thumbnails.
pub const PHOTO_SPACING: f64 = 8.0;
/// Photo row to whatever follows it.
pub const PHOTOS_TO_TEXT: f64 = 10.0;
/// Text to the show-more control or the created line.
pub const TEXT_TO_CREATED: f64 = 6.0;
pub const SHOW_MORE_TO_CREATED: f64 = 6.0;

/// Frames of every element in a review cell, plus the cell height.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLayout {
    pub avatar: Rect,
    pub username: Rect,
    pub rating: Rect,
    /// One frame per laid-out thumbnail, at most [`MAX_PHOTOS`].
    pub photos: Vec<Rect>,
    /// `None` when the review text is empty.
    pub text: Option<Rect>,
    /// `None` when the control is hidden.
    pub show_more: Option<Rect>,
    pub created: Rect,
    pub height: f64,
}

impl ReviewLayout {
    pub fn is_show_more_visible(&self) -> bool {
        self.show_more.is_some()
    }
}

/// Compute the frames of a review cell `max_width` wide.
///
/// Top to bottom: avatar beside the username and rating, the photo row (if
/// any), the text (if non-empty), the show-more control (if the text is
/// truncated), the created line. A gap is only added after a stage that is
/// present.
///
/// The control is shown iff the item still has a line limit and the full
/// text is taller than `line_height * max_lines`; the text frame is then cut
/// to that height. Expanded items (`max_lines == 0`) always get the full text.
///
/// Pure: the result depends only on the item, the width and the measurer.
pub fn layout_review<M>(item: &ReviewItem, max_width: f64, measurer: &M) -> ReviewLayout
where
    M: TextMeasurer + ?Sized,
{
    let avatar = Rect::new(INSETS.left, INSETS.top, AVATAR_SIZE);

    let column_x = avatar.max_x() + AVATAR_TO_USERNAME;
    let column_width = (max_width - INSETS.right - column_x).max(0.0);

    let username = Rect::new(
        column_x,
        INSETS.top,
        measurer.measure(item.username(), TextStyle::Username, column_width),
    );
    let rating = Rect::new(
        column_x,
        username.max_y() + USERNAME_TO_RATING,
        RATING_SIZE,
    );
    let header_bottom = avatar.max_y().max(rating.max_y());

    let mut photos = Vec::new();
    let mut cursor = if item.photos().is_empty() {
        header_bottom + RATING_TO_TEXT
    } else {
        let top = header_bottom + RATING_TO_PHOTOS;
        let mut x = column_x;
        for _ in item.photos().iter().take(MAX_PHOTOS) {
            photos.push(Rect::new(x, top, PHOTO_SIZE));
            x += PHOTO_SIZE.width + PHOTO_SPACING;
        }
        top + PHOTO_SIZE.height + PHOTOS_TO_TEXT
    };

    let mut text = None;
    let mut show_more = None;

    if !item.text().is_empty() {
        let clamped_height =
            measurer.line_height(TextStyle::Body) * item.max_lines() as f64;
        let actual = measurer.measure(item.text(), TextStyle::Body, column_width);
        let truncated = item.max_lines() != 0 && actual.height > clamped_height;

        let height = if truncated {
            clamped_height
        } else {
            actual.height
        };
        let frame = Rect::new(column_x, cursor, Size::new(actual.width, height));
        cursor = frame.max_y() + TEXT_TO_CREATED;
        text = Some(frame);

        if truncated {
            let frame = Rect::new(
                column_x,
                cursor,
                measurer.measure(SHOW_MORE_TEXT, TextStyle::ShowMore, f64::INFINITY),
            );
            cursor = frame.max_y() + SHOW_MORE_TO_CREATED;
            show_more = Some(frame);
        }
    }

    let created = Rect::new(
        column_x,
        cursor,
        measurer.measure(item.created(), TextStyle::Created, column_width),
    );

    ReviewLayout {
        avatar,
        username,
        rating,
        photos,
        text,
        show_more,
        height: created.max_y() + INSETS.bottom,
        created,
    }
}

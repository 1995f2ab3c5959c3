use std::fmt;

/// Star rating glyph derived once from [`Review::rating`](super::Review).
///
/// Ratings outside 1..=5 are clamped. Layout treats the glyph as a fixed-size
/// image, see [`RATING_SIZE`](crate::layout::RATING_SIZE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingGlyph {
    stars: u8,
}

impl RatingGlyph {
    pub const MAX_STARS: u8 = 5;

    pub fn new(rating: i32) -> Self {
        let stars = rating.clamp(1, i32::from(Self::MAX_STARS)) as u8;
        Self { stars }
    }

    pub fn stars(&self) -> u8 {
        self.stars
    }
}

impl fmt::Display for RatingGlyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..Self::MAX_STARS {
            f.write_str(if i < self.stars { "★" } else { "☆" })?;
        }
        Ok(())
    }
}

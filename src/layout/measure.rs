use super::Size;
use crate::util::{display_width, wrap_to_width};

/// Text roles with distinct fonts in a review cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Username,
    Body,
    Created,
    ShowMore,
    ReviewCount,
}

/// Text measurement oracle used by the layout engine.
///
/// Implementations must be deterministic: the same text, style and width
/// always measure the same, or cached row heights go stale.
pub trait TextMeasurer {
    /// Height of a single line in `style`.
    fn line_height(&self, style: TextStyle) -> f64;

    /// Bounding size of `text` wrapped at `max_width`, with no line limit.
    fn measure(&self, text: &str, style: TextStyle, max_width: f64) -> Size;

    /// Height of `text` wrapped at `max_width` and cut to `max_lines` lines
    /// (0 = unlimited).
    fn measure_clamped(&self, text: &str, style: TextStyle, max_width: f64, max_lines: usize) -> f64 {
        let full = self.measure(text, style, max_width).height;
        if max_lines == 0 {
            return full;
        }
        full.min(self.line_height(style) * max_lines as f64)
    }
}

/// Per-style metrics for [`MonospaceMeasurer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Width of one display column
    pub column_width: f64,
    pub line_height: f64,
}

impl FontMetrics {
    pub const fn new(column_width: f64, line_height: f64) -> Self {
        Self {
            column_width,
            line_height,
        }
    }
}

/// Deterministic measurer over a fixed-pitch grid.
///
/// Each display column (see [`display_width`]) is `column_width` wide, and
/// text wraps greedily at word boundaries. Good enough for headless layout and
/// tests; real renderers plug in their own [`TextMeasurer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonospaceMeasurer {
    username: FontMetrics,
    body: FontMetrics,
    created: FontMetrics,
    show_more: FontMetrics,
    review_count: FontMetrics,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            username: FontMetrics::new(9.0, 20.0),
            body: FontMetrics::new(8.0, 18.0),
            created: FontMetrics::new(7.0, 16.0),
            show_more: FontMetrics::new(8.0, 18.0),
            review_count: FontMetrics::new(8.0, 18.0),
        }
    }
}

impl MonospaceMeasurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same metrics for every style.
    pub fn uniform(metrics: FontMetrics) -> Self {
        Self {
            username: metrics,
            body: metrics,
            created: metrics,
            show_more: metrics,
            review_count: metrics,
        }
    }

    pub fn with_metrics(mut self, style: TextStyle, metrics: FontMetrics) -> Self {
        *self.metrics_mut(style) = metrics;
        self
    }

    pub fn metrics(&self, style: TextStyle) -> FontMetrics {
        match style {
            TextStyle::Username => self.username,
            TextStyle::Body => self.body,
            TextStyle::Created => self.created,
            TextStyle::ShowMore => self.show_more,
            TextStyle::ReviewCount => self.review_count,
        }
    }

    fn metrics_mut(&mut self, style: TextStyle) -> &mut FontMetrics {
        match style {
            TextStyle::Username => &mut self.username,
            TextStyle::Body => &mut self.body,
            TextStyle::Created => &mut self.created,
            TextStyle::ShowMore => &mut self.show_more,
            TextStyle::ReviewCount => &mut self.review_count,
        }
    }

    /// Wrapped lines of `text` at `max_width`, as the measurer sees them.
    pub fn lines(&self, text: &str, style: TextStyle, max_width: f64) -> Vec<String> {
        let metrics = self.metrics(style);
        // Float-to-int casts saturate: infinity -> usize::MAX, NaN/negative -> 0.
        let columns = (max_width / metrics.column_width).floor() as usize;
        wrap_to_width(text, columns)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn line_height(&self, style: TextStyle) -> f64 {
        self.metrics(style).line_height
    }

    fn measure(&self, text: &str, style: TextStyle, max_width: f64) -> Size {
        let metrics = self.metrics(style);
        let lines = self.lines(text, style, max_width);
        let widest = lines.iter().map(|l| display_width(l)).max().unwrap_or(0);

        Size::new(
            widest as f64 * metrics.column_width,
            lines.len() as f64 * metrics.line_height,
        )
    }
}

use super::{Rect, TextMeasurer, TextStyle};
use crate::model::FooterItem;

/// Frames of the trailing review-count row.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterLayout {
    pub label: Rect,
    pub height: f64,
}

/// Center the count label horizontally; the label sits half its own height
/// below the top edge, and the row ends at the label's bottom.
pub fn layout_footer<M>(footer: &FooterItem, max_width: f64, measurer: &M) -> FooterLayout
where
    M: TextMeasurer + ?Sized,
{
    let size = measurer.measure(footer.label(), TextStyle::ReviewCount, max_width.max(0.0));
    let label = Rect::new(
        (max_width - size.width) / 2.0,
        size.height / 2.0,
        size,
    );

    FooterLayout {
        height: label.max_y(),
        label,
    }
}

use serde::Deserialize;
use url::Url;

/// One review as supplied by a [`ReviewSource`](crate::feed::ReviewSource).
///
/// Immutable once received. Field names follow the wire payload
/// (`first_name`, `avatar_url`, `photo_urls`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub first_name: String,
    pub last_name: String,
    /// Nominally 1..=5; out-of-range values are clamped when rendered.
    pub rating: i32,
    pub text: String,
    /// Opaque, already formatted by the source.
    pub created: String,
    #[serde(default)]
    pub avatar_url: Option<Url>,
    /// Order is significant and duplicates are allowed.
    #[serde(default)]
    pub photo_urls: Vec<Url>,
}

/// One page of reviews plus the total size of the underlying collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewPage {
    pub items: Vec<Review>,
    #[serde(rename = "count")]
    pub total_count: usize,
}

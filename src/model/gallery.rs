use super::ReviewItem;
use crate::images::Image;

/// Full-screen photo browsing over one review's photo slots.
///
/// Takes a snapshot of the slots when opened; a slot that was still loading
/// at that point stays empty here even if the feed item fills it later.
#[derive(Debug, Clone)]
pub struct PhotoGallery {
    photos: Vec<Option<Image>>,
    index: usize,
}

impl PhotoGallery {
    /// Open at `start`. `None` if the item has no photo at that index.
    pub fn open(item: &ReviewItem, start: usize) -> Option<Self> {
        if start >= item.photos().len() {
            return None;
        }
        Some(Self {
            photos: item.photos().to_vec(),
            index: start,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// `None` while the photo is still loading (or failed to load).
    pub fn current(&self) -> Option<&Image> {
        self.photos.get(self.index).and_then(Option::as_ref)
    }

    /// Move forward; stays put on the last photo.
    pub fn show_next(&mut self) -> bool {
        if self.index + 1 >= self.photos.len() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Move back; stays put on the first photo.
    pub fn show_previous(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }
}

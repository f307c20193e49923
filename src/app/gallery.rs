// SPDX-License-Identifier: GPL-3.0-only

//! Photo grid overlay state

use crate::storage::Thumbnail;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Which photos the overlay lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GallerySource {
    /// Photos taken since the screen opened
    Session,
    /// Every photo in the output directory
    All,
}

impl std::fmt::Display for GallerySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GallerySource::Session => write!(f, "Session photos"),
            GallerySource::All => write!(f, "All photos"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Open overlay: photo list, selection and loaded thumbnails
#[derive(Debug, Clone)]
pub struct GalleryState {
    pub source: GallerySource,
    photos: Vec<PathBuf>,
    selected: usize,
    /// `None` marks a photo that failed to decode
    thumbnails: HashMap<PathBuf, Option<Thumbnail>>,
    pending: HashSet<PathBuf>,
}

impl GalleryState {
    /// `None` when there is nothing to show
    pub fn new(source: GallerySource, photos: Vec<PathBuf>) -> Option<Self> {
        if photos.is_empty() {
            return None;
        }
        Some(Self {
            source,
            photos,
            selected: 0,
            thumbnails: HashMap::new(),
            pending: HashSet::new(),
        })
    }

    pub fn photos(&self) -> &[PathBuf] {
        &self.photos
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_photo(&self) -> Option<&Path> {
        self.photos.get(self.selected).map(PathBuf::as_path)
    }

    /// Select a photo by index; false when out of range
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.photos.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    /// Move the selection within a grid of `columns`, stopping at the ends
    pub fn move_selection(&mut self, direction: GalleryDirection, columns: usize) {
        let columns = columns.max(1);
        let last = self.photos.len() - 1;
        self.selected = match direction {
            GalleryDirection::Left => self.selected.saturating_sub(1),
            GalleryDirection::Right => (self.selected + 1).min(last),
            GalleryDirection::Up => self.selected.checked_sub(columns).unwrap_or(self.selected),
            GalleryDirection::Down => {
                let next = self.selected + columns;
                if next <= last { next } else { self.selected }
            }
        };
    }

    /// Indices shown on the page holding the selection
    pub fn page(&self, per_page: usize) -> Range<usize> {
        let per_page = per_page.max(1);
        let start = (self.selected / per_page) * per_page;
        start..(start + per_page).min(self.photos.len())
    }

    /// Photos in `range` with no thumbnail loaded or requested; marks them
    /// requested.
    pub fn request_thumbnails(&mut self, range: Range<usize>) -> Vec<PathBuf> {
        let end = range.end.min(self.photos.len());
        let start = range.start.min(end);
        let mut requests = Vec::new();
        for path in &self.photos[start..end] {
            if !self.thumbnails.contains_key(path) && self.pending.insert(path.clone()) {
                requests.push(path.clone());
            }
        }
        requests
    }

    pub fn set_thumbnail(&mut self, path: PathBuf, thumbnail: Option<Thumbnail>) {
        self.pending.remove(&path);
        if self.photos.contains(&path) {
            self.thumbnails.insert(path, thumbnail);
        }
    }

    /// Loaded thumbnail for a photo; outer `None` while loading
    pub fn thumbnail(&self, path: &Path) -> Option<Option<&Thumbnail>> {
        self.thumbnails.get(path).map(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(count: usize) -> GalleryState {
        let photos = (0..count)
            .map(|i| PathBuf::from(format!("/photos/{i:03}.jpg")))
            .collect();
        GalleryState::new(GallerySource::All, photos).unwrap()
    }

    #[test]
    fn test_empty_list_opens_nothing() {
        assert!(GalleryState::new(GallerySource::Session, Vec::new()).is_none());
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut g = gallery(7);
        g.move_selection(GalleryDirection::Left, 3);
        assert_eq!(g.selected(), 0);
        g.move_selection(GalleryDirection::Down, 3);
        g.move_selection(GalleryDirection::Down, 3);
        assert_eq!(g.selected(), 6);
        g.move_selection(GalleryDirection::Down, 3);
        assert_eq!(g.selected(), 6);
        g.move_selection(GalleryDirection::Right, 3);
        assert_eq!(g.selected(), 6);
        g.move_selection(GalleryDirection::Up, 3);
        assert_eq!(g.selected(), 3);
        assert_eq!(g.selected_photo(), Some(Path::new("/photos/003.jpg")));
    }

    #[test]
    fn test_page_follows_selection() {
        let mut g = gallery(10);
        assert_eq!(g.page(4), 0..4);
        for _ in 0..9 {
            g.move_selection(GalleryDirection::Right, 4);
        }
        assert_eq!(g.page(4), 8..10);
    }

    #[test]
    fn test_thumbnails_requested_once() {
        let mut g = gallery(5);
        assert_eq!(g.request_thumbnails(0..3).len(), 3);
        assert!(g.request_thumbnails(0..3).is_empty());

        let first = g.photos()[0].clone();
        g.set_thumbnail(first.clone(), None);
        assert!(matches!(g.thumbnail(&first), Some(None)));
        assert_eq!(g.request_thumbnails(0..5).len(), 2);
        assert!(g.thumbnail(&g.photos()[4]).is_none());
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Gallery overlay handlers
//!
//! Opening the session or directory photo grid, moving the selection,
//! loading thumbnails off the UI thread and opening a photo externally.

use crate::app::gallery::{GalleryDirection, GallerySource, GalleryState};
use crate::app::layout::{self, gallery_grid};
use crate::app::state::{AppModel, Message};
use crate::app::task::Task;
use crate::constants::{GALLERY_CELL_HEIGHT, GALLERY_CELL_WIDTH};
use crate::storage::{self, Thumbnail};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Thumbnail size in half-block pixels: the cell minus padding and caption
const THUMBNAIL_WIDTH: u32 = GALLERY_CELL_WIDTH as u32 - 2;
const THUMBNAIL_HEIGHT: u32 = (GALLERY_CELL_HEIGHT as u32 - 2) * 2;

impl AppModel {
    /// Photos taken since the screen opened, in capture order
    pub(crate) fn handle_show_session_photos(&mut self) -> Task {
        let photos = self.photos.as_slice().to_vec();
        self.open_gallery(GallerySource::Session, photos)
    }

    /// Every photo in the output directory, newest first
    pub(crate) fn handle_show_all_photos(&mut self) -> Task {
        let photos = storage::list_photos(&self.output_directory);
        self.open_gallery(GallerySource::All, photos)
    }

    fn open_gallery(&mut self, source: GallerySource, photos: Vec<PathBuf>) -> Task {
        let count = photos.len();
        match GalleryState::new(source, photos) {
            Some(gallery) => {
                info!(source = %source, count, "Opening gallery");
                self.gallery = Some(gallery);
                self.request_visible_thumbnails()
            }
            None => {
                debug!(source = %source, "No photos to show");
                Task::none()
            }
        }
    }

    /// Grid size (columns, slots per page) for the current terminal
    fn gallery_page_size(&self) -> (usize, usize) {
        let (columns, rows) = gallery_grid(self.layout().gallery_grid_area());
        (columns as usize, columns as usize * rows as usize)
    }

    pub(crate) fn handle_gallery_move(&mut self, direction: GalleryDirection) -> Task {
        let (columns, _) = self.gallery_page_size();
        let Some(gallery) = self.gallery.as_mut() else {
            return Task::none();
        };
        gallery.move_selection(direction, columns);
        self.request_visible_thumbnails()
    }

    /// A click on a cell selects it; a click on the selected cell opens it
    pub(crate) fn handle_gallery_click(&mut self, column: u16, row: u16) -> Task {
        let (_, per_page) = self.gallery_page_size();
        let area = self.layout().gallery_grid_area();
        let Some(gallery) = self.gallery.as_mut() else {
            return Task::none();
        };
        let Some(slot) = layout::gallery_slot_at(area, column, row) else {
            return Task::none();
        };
        let index = gallery.page(per_page).start + slot;
        if index == gallery.selected() {
            return Task::done(Message::OpenSelectedPhoto);
        }
        gallery.select(index);
        Task::none()
    }

    pub(crate) fn handle_open_selected_photo(&mut self) -> Task {
        let Some(path) = self
            .gallery
            .as_ref()
            .and_then(|gallery| gallery.selected_photo())
        else {
            return Task::none();
        };
        info!(path = %path.display(), "Opening photo in viewer");
        if let Err(e) = open::that_detached(path) {
            warn!(path = %path.display(), error = %e, "Failed to open photo");
        }
        Task::none()
    }

    pub(crate) fn handle_thumbnail_loaded(
        &mut self,
        path: PathBuf,
        thumbnail: Option<Thumbnail>,
    ) -> Task {
        if let Some(gallery) = self.gallery.as_mut() {
            gallery.set_thumbnail(path, thumbnail);
        }
        Task::none()
    }

    /// Load thumbnails for the page holding the selection
    pub(crate) fn request_visible_thumbnails(&mut self) -> Task {
        let (_, per_page) = self.gallery_page_size();
        let Some(gallery) = self.gallery.as_mut() else {
            return Task::none();
        };
        let page = gallery.page(per_page);
        let requests = gallery.request_thumbnails(page);
        Task::batch(requests.into_iter().map(|path| {
            Task::perform(move || {
                let thumbnail = storage::load_thumbnail(&path, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT);
                Message::ThumbnailLoaded { path, thumbnail }
            })
        }))
    }
}

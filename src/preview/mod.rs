// SPDX-License-Identifier: GPL-3.0-only

//! Strip preview board
//!
//! The board shows the main strip at a display width with one overlay per
//! slot where the session's captures appear, plus thumbnail strips that can
//! be swapped into the main position.

use crate::errors::{AppError, ExportError};
use crate::pipelines::photo::CapturedImage;
use crate::template::{StripTemplate, TemplateLayout};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Overlay rectangle in display coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Slot overlays for a strip shown at some display width
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayLayout {
    pub scale: f64,
    pub rects: Vec<OverlayRect>,
}

impl OverlayLayout {
    /// Scale every slot by `display_width / natural_width`
    pub fn compute(natural_width: u32, display_width: f64, layout: &TemplateLayout) -> Self {
        let scale = if natural_width == 0 {
            0.0
        } else {
            display_width / natural_width as f64
        };
        let rects = layout
            .slots()
            .iter()
            .map(|slot| OverlayRect {
                left: slot.x as f64 * scale,
                top: slot.y as f64 * scale,
                width: slot.width as f64 * scale,
                height: slot.height as f64 * scale,
            })
            .collect();
        Self { scale, rects }
    }
}

/// Main strip, thumbnails, and the captures bound to each overlay
#[derive(Debug, Clone)]
pub struct PreviewBoard {
    main: StripTemplate,
    thumbnails: Vec<StripTemplate>,
    display_width: f64,
    overlays: OverlayLayout,
    bound: BTreeMap<usize, CapturedImage>,
}

impl PreviewBoard {
    pub fn new(main: StripTemplate, thumbnails: Vec<StripTemplate>, display_width: f64) -> Self {
        let mut board = Self {
            main,
            thumbnails,
            display_width,
            overlays: OverlayLayout::default(),
            bound: BTreeMap::new(),
        };
        board.recompute_overlays();
        board
    }

    pub fn main(&self) -> &StripTemplate {
        &self.main
    }

    pub fn thumbnails(&self) -> &[StripTemplate] {
        &self.thumbnails
    }

    pub fn overlays(&self) -> &OverlayLayout {
        &self.overlays
    }

    pub fn display_width(&self) -> f64 {
        self.display_width
    }

    /// Capture currently shown in overlay `index`
    pub fn bound_capture(&self, index: usize) -> Option<&CapturedImage> {
        self.bound.get(&index)
    }

    /// Load the main strip's artwork and lay out the overlays for it
    pub async fn load_main(&mut self) -> Result<(u32, u32), ExportError> {
        let size = self.main.load().await?;
        self.on_template_loaded();
        Ok(size)
    }

    /// Recompute overlays after the main strip's artwork became available
    pub fn on_template_loaded(&mut self) {
        self.recompute_overlays();
    }

    pub fn set_display_width(&mut self, width: f64) {
        self.display_width = width;
        self.recompute_overlays();
    }

    /// Show a capture in the overlay with the same slot index
    pub fn show_capture(&mut self, capture: CapturedImage) {
        debug!(slot = capture.index, "Overlay updated");
        self.bound.insert(capture.index, capture);
    }

    /// Drop every bound capture (new session)
    pub fn clear_captures(&mut self) {
        self.bound.clear();
    }

    /// Exchange thumbnail `index` with the main strip
    ///
    /// The incoming strip is loaded first so the overlays are laid out on
    /// its artwork. A strip that fails to load stays a thumbnail.
    pub async fn swap_with_main(&mut self, index: usize) -> Result<(), AppError> {
        let count = self.thumbnails.len();
        let thumbnail = self.thumbnails.get_mut(index).ok_or_else(|| {
            AppError::Other(format!(
                "No thumbnail strip at index {} ({} available)",
                index, count
            ))
        })?;
        thumbnail.load().await?;

        std::mem::swap(&mut self.main, thumbnail);
        info!(
            main = %self.main.source().label(),
            thumbnail = index,
            "Swapped strip into main position"
        );
        self.recompute_overlays();
        Ok(())
    }

    fn recompute_overlays(&mut self) {
        self.overlays = match self.main.natural_size() {
            Some((natural_width, _)) => {
                OverlayLayout::compute(natural_width, self.display_width, self.main.layout())
            }
            None => OverlayLayout::default(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FrameSlot;

    #[test]
    fn overlays_scale_with_display_width() {
        let overlays = OverlayLayout::compute(2210, 442.0, &TemplateLayout::classic());
        assert_eq!(overlays.scale, 0.2);
        assert_eq!(overlays.rects.len(), 4);
        let first = overlays.rects[0];
        assert!((first.left - 33.4).abs() < 1e-9);
        assert!((first.top - 43.0).abs() < 1e-9);
        assert!((first.width - 375.2).abs() < 1e-9);
    }

    #[test]
    fn unloaded_main_has_no_overlays() {
        let board = PreviewBoard::new(StripTemplate::builtin(), Vec::new(), 400.0);
        assert!(board.overlays().rects.is_empty());
    }

    #[test]
    fn display_width_change_recomputes() {
        let layout = TemplateLayout::new(vec![FrameSlot::new(10, 20, 30, 40)]);
        let main = StripTemplate::from_image("a", image::RgbaImage::new(100, 200), layout);
        let mut board = PreviewBoard::new(main, Vec::new(), 100.0);
        assert_eq!(board.overlays().rects[0].left, 10.0);

        board.set_display_width(50.0);
        assert_eq!(board.overlays().rects[0].left, 5.0);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Strip templates and their frame slots
//!
//! A template is the printable strip artwork. Captures are drawn into its
//! fixed slots first and the artwork is laid over them, so slot windows in
//! the artwork are transparent.

use crate::errors::ExportError;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Natural size of the built-in strip
pub const BUILTIN_SIZE: (u32, u32) = (2210, 5000);

/// Fixed rectangle on the strip, in template pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameSlot {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Ordered slots of a strip layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    slots: Vec<FrameSlot>,
}

impl TemplateLayout {
    pub fn new(slots: Vec<FrameSlot>) -> Self {
        Self { slots }
    }

    /// The classic four-up vertical strip
    pub fn classic() -> Self {
        Self::new(vec![
            FrameSlot::new(167, 215, 1876, 1098),
            FrameSlot::new(167, 1417, 1876, 1098),
            FrameSlot::new(167, 2608, 1876, 1098),
            FrameSlot::new(167, 3796, 1876, 1100),
        ])
    }

    /// Same layout with every coordinate divided by `divisor`
    ///
    /// Handy for small previews and fast tests. Sizes never drop below 1.
    pub fn scaled_down(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self::new(
            self.slots
                .iter()
                .map(|s| {
                    FrameSlot::new(
                        s.x / divisor,
                        s.y / divisor,
                        (s.width / divisor).max(1),
                        (s.height / divisor).max(1),
                    )
                })
                .collect(),
        )
    }

    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<FrameSlot> {
        self.slots.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self::classic()
    }
}

/// Where a template's artwork comes from
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Image file on disk
    File(PathBuf),
    /// Generated strip sized to fit the layout
    Builtin { width: u32, height: u32 },
    /// Already decoded artwork
    Memory { label: String, image: Arc<RgbaImage> },
}

impl TemplateSource {
    /// The built-in classic strip
    pub fn builtin() -> Self {
        TemplateSource::Builtin {
            width: BUILTIN_SIZE.0,
            height: BUILTIN_SIZE.1,
        }
    }

    pub fn label(&self) -> String {
        match self {
            TemplateSource::File(path) => path.display().to_string(),
            TemplateSource::Builtin { width, height } => format!("builtin:{}x{}", width, height),
            TemplateSource::Memory { label, .. } => label.clone(),
        }
    }
}

impl PartialEq for TemplateSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TemplateSource::File(a), TemplateSource::File(b)) => a == b,
            (
                TemplateSource::Builtin {
                    width: wa,
                    height: ha,
                },
                TemplateSource::Builtin {
                    width: wb,
                    height: hb,
                },
            ) => wa == wb && ha == hb,
            (
                TemplateSource::Memory {
                    label: la,
                    image: ia,
                },
                TemplateSource::Memory {
                    label: lb,
                    image: ib,
                },
            ) => la == lb && Arc::ptr_eq(ia, ib),
            _ => false,
        }
    }
}

/// A strip template and, once loaded, its artwork
#[derive(Debug, Clone)]
pub struct StripTemplate {
    source: TemplateSource,
    layout: TemplateLayout,
    image: Option<Arc<RgbaImage>>,
}

impl StripTemplate {
    /// Unloaded template; call [`StripTemplate::load`] before exporting
    pub fn new(source: TemplateSource, layout: TemplateLayout) -> Self {
        let image = match &source {
            TemplateSource::Memory { image, .. } => Some(Arc::clone(image)),
            _ => None,
        };
        Self {
            source,
            layout,
            image,
        }
    }

    /// The built-in classic strip (unloaded)
    pub fn builtin() -> Self {
        Self::new(TemplateSource::builtin(), TemplateLayout::classic())
    }

    /// Template from in-memory artwork; loaded immediately
    pub fn from_image(label: impl Into<String>, image: RgbaImage, layout: TemplateLayout) -> Self {
        Self::new(
            TemplateSource::Memory {
                label: label.into(),
                image: Arc::new(image),
            },
            layout,
        )
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Artwork, once loaded
    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    /// Natural pixel size, once loaded
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|image| image.dimensions())
    }

    /// Decode or generate the artwork
    pub async fn load(&mut self) -> Result<(u32, u32), ExportError> {
        if let Some(size) = self.natural_size() {
            return Ok(size);
        }

        let source = self.source.clone();
        let layout = self.layout.clone();
        let image = tokio::task::spawn_blocking(move || match source {
            TemplateSource::File(path) => image::open(&path)
                .map(|image| image.to_rgba8())
                .map_err(|e| ExportError::TemplateLoad(format!("{}: {}", path.display(), e))),
            TemplateSource::Builtin { width, height } => Ok(render_builtin(width, height, &layout)),
            TemplateSource::Memory { image, .. } => Ok((*image).clone()),
        })
        .await
        .map_err(|e| ExportError::TemplateLoad(format!("Template task failed: {}", e)))??;

        let size = image.dimensions();
        info!(
            template = %self.source.label(),
            width = size.0,
            height = size.1,
            "Strip template loaded"
        );
        self.image = Some(Arc::new(image));
        Ok(size)
    }
}

/// Generate plain strip artwork with transparent windows at every slot
pub fn render_builtin(width: u32, height: u32, layout: &TemplateLayout) -> RgbaImage {
    const PAPER: Rgba<u8> = Rgba([250, 244, 232, 255]);
    const EDGE: Rgba<u8> = Rgba([40, 34, 30, 255]);
    const WINDOW: Rgba<u8> = Rgba([0, 0, 0, 0]);
    const EDGE_WIDTH: u32 = 12;

    let image = RgbaImage::from_fn(width, height, |x, y| {
        let mut pixel = PAPER;
        for slot in layout.slots() {
            if slot.contains(x, y) {
                return WINDOW;
            }
            let outer = FrameSlot::new(
                slot.x.saturating_sub(EDGE_WIDTH),
                slot.y.saturating_sub(EDGE_WIDTH),
                slot.width + 2 * EDGE_WIDTH,
                slot.height + 2 * EDGE_WIDTH,
            );
            if outer.contains(x, y) {
                pixel = EDGE;
            }
        }
        pixel
    });

    debug!(width, height, slots = layout.len(), "Built-in template rendered");
    image
}

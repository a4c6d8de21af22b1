// SPDX-License-Identifier: GPL-3.0-only

//! Frame compositing: cover fit and mirroring
//!
//! A frame is scaled uniformly so it covers the whole target rectangle,
//! centered, with the overflow cropped away. Mirroring flips the result
//! horizontally, like the selfie preview.

use crate::backends::camera::CameraFrame;
use crate::errors::PhotoError;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Part of the source that stays visible after a cover fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverGeometry {
    /// Uniform scale applied to the source
    pub scale: f64,
    /// Visible source window, in source pixels
    pub crop_x: u32,
    pub crop_y: u32,
    pub crop_width: u32,
    pub crop_height: u32,
}

impl CoverGeometry {
    /// Compute the cover fit of a `source_w`×`source_h` frame into `target_w`×`target_h`
    pub fn compute(source_w: u32, source_h: u32, target_w: u32, target_h: u32) -> Self {
        let scale = f64::max(
            target_w as f64 / source_w as f64,
            target_h as f64 / source_h as f64,
        );
        let crop_width = ((target_w as f64 / scale).round() as u32).clamp(1, source_w);
        let crop_height = ((target_h as f64 / scale).round() as u32).clamp(1, source_h);

        Self {
            scale,
            crop_x: (source_w - crop_width) / 2,
            crop_y: (source_h - crop_height) / 2,
            crop_width,
            crop_height,
        }
    }
}

/// Scale `source` to cover `width`×`height`, cropping the centered overflow
///
/// Only the visible window is resized, so the intermediate buffer never
/// exceeds the source.
pub fn cover_fit(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let geometry = CoverGeometry::compute(source.width(), source.height(), width, height);
    let window = imageops::crop_imm(
        source,
        geometry.crop_x,
        geometry.crop_y,
        geometry.crop_width,
        geometry.crop_height,
    )
    .to_image();

    if window.dimensions() == (width, height) {
        window
    } else {
        imageops::resize(&window, width, height, FilterType::Triangle)
    }
}

/// Render `frame` into an image of exactly `width`×`height`
pub fn compose_frame(
    frame: &CameraFrame,
    width: u32,
    height: u32,
    mirror: bool,
) -> Result<RgbaImage, PhotoError> {
    if !frame.has_dimensions() {
        return Err(PhotoError::NoFrameAvailable);
    }
    if width == 0 || height == 0 {
        return Err(PhotoError::InvalidFrame(format!(
            "target rectangle {}x{} is empty",
            width, height
        )));
    }

    let source = frame.to_rgba_image()?;
    let fitted = cover_fit(&source, width, height);

    debug!(
        source_width = frame.width,
        source_height = frame.height,
        width,
        height,
        mirror,
        "Frame composited"
    );

    Ok(if mirror {
        imageops::flip_horizontal(&fitted)
    } else {
        fitted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn wide_source_is_cropped_horizontally() {
        // 200x100 into 100x100: scale 1.0 by height, 50px cropped each side
        let geometry = CoverGeometry::compute(200, 100, 100, 100);
        assert_eq!(geometry.scale, 1.0);
        assert_eq!((geometry.crop_x, geometry.crop_y), (50, 0));
        assert_eq!((geometry.crop_width, geometry.crop_height), (100, 100));
    }

    #[test]
    fn small_source_is_scaled_up() {
        // Scale 2.93125 by width; 1098 / 2.93125 = 374.6 rows stay visible
        let geometry = CoverGeometry::compute(640, 480, 1876, 1098);
        assert_eq!((geometry.crop_width, geometry.crop_height), (640, 375));
        assert_eq!((geometry.crop_x, geometry.crop_y), (0, 52));
    }

    #[test]
    fn extreme_aspect_only_resizes_the_visible_window() {
        let geometry = CoverGeometry::compute(1, 500, 1876, 1098);
        assert_eq!(geometry.scale, 1876.0);
        assert_eq!((geometry.crop_width, geometry.crop_height), (1, 1));
        assert_eq!((geometry.crop_x, geometry.crop_y), (0, 249));

        let source = RgbaImage::from_fn(1, 500, |_, y| {
            if y == 249 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        });
        let fitted = cover_fit(&source, 1876, 1098);
        assert_eq!(fitted.dimensions(), (1876, 1098));
        assert_eq!(fitted.get_pixel(938, 549), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn cover_fit_keeps_the_center() {
        // Left third red, middle green, right third blue
        let source = RgbaImage::from_fn(300, 100, |x, _| match x / 100 {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let fitted = cover_fit(&source, 100, 100);
        assert_eq!(fitted.dimensions(), (100, 100));
        assert_eq!(fitted.get_pixel(50, 50), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn mirror_is_horizontal_flip() {
        let source = RgbaImage::from_fn(64, 48, |x, y| Rgba([x as u8 * 3, y as u8 * 5, 7, 255]));
        let frame = CameraFrame::from_image(&source);

        let plain = compose_frame(&frame, 40, 20, false).unwrap();
        let mirrored = compose_frame(&frame, 40, 20, true).unwrap();
        assert_eq!(mirrored, imageops::flip_horizontal(&plain));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = CameraFrame::from_rgba(0, 0, Vec::new());
        assert_eq!(
            compose_frame(&frame, 10, 10, false),
            Err(PhotoError::NoFrameAvailable)
        );
    }
}

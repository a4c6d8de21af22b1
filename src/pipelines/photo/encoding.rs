// SPDX-License-Identifier: GPL-3.0-only

//! PNG encoding for captured slots and exported strips

use crate::errors::PhotoError;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode an RGBA image losslessly as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| PhotoError::EncodingFailed(format!("PNG encoding failed: {}", e)))?;

    let data = buffer.into_inner();
    debug!(
        width = image.width(),
        height = image.height(),
        size_kb = data.len() / 1024,
        "PNG encoded"
    );
    Ok(data)
}

/// Decode PNG bytes back into RGBA pixels
pub fn decode_png(data: &[u8]) -> Result<RgbaImage, PhotoError> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .map(|image| image.to_rgba8())
        .map_err(|e| PhotoError::DecodingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_is_lossless() {
        let image = RgbaImage::from_fn(7, 5, |x, y| image::Rgba([x as u8, y as u8, 200, 128]));
        let decoded = decode_png(&encode_png(&image).unwrap()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            decode_png(b"not a png"),
            Err(PhotoError::DecodingFailed(_))
        ));
    }
}

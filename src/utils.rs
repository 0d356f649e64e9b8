//! Small helpers shared by the UI glue: image loading, hex colors,
//! and the placeholder shown before a library is opened.

use std::path::Path;

use slint::SharedPixelBuffer;

use crate::error::{AppError, Result};

/// Load an image for display and report its pixel dimensions, which the
/// editor needs for clamping.
pub fn load_image(path: &Path) -> Result<(slint::Image, u32, u32)> {
    let image = slint::Image::load_from_path(path)
        .map_err(|e| AppError::ImageLoad(format!("{}: {:?}", path.display(), e)))?;
    let size = image.size();
    Ok((image, size.width, size.height))
}

/// Checkerboard stand-in shown when no image is available.
pub fn placeholder_image() -> slint::Image {
    let width = 96u32;
    let height = 96u32;
    let mut buffer = SharedPixelBuffer::new(width, height);
    let data = buffer.make_mut_bytes();
    for y in 0..height {
        for x in 0..width {
            let v = if (x / 12 + y / 12) % 2 == 0 { 55 } else { 105 };
            let i = ((y * width + x) * 3) as usize;
            data[i] = v;
            data[i + 1] = v;
            data[i + 2] = v;
        }
    }
    slint::Image::from_rgb8(buffer)
}

/// Parse a "#rrggbb" hex string into a Slint color.
pub fn parse_color(hex: &str) -> Option<slint::Color> {
    let hex = hex.trim_start_matches('#');
    // The byte slicing below needs char boundaries at every even offset.
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(slint::Color::from_rgb_u8(r, g, b))
}

//! Combining an RCT image with its RC8 alpha mask, and splitting RGBA pixels back into the pair.
//!
//! The mask is inverted: a palette color of white is fully transparent, black fully opaque. The
//! opacity of a pixel is `255 - (r + g + b) / 3` of its palette color.

use crate::{Palette, PaletteImage, TrueColorImage};
use itertools::izip;
use snafu::{ensure, Snafu};

#[derive(Debug, Snafu)]
pub enum ComposeError {
    #[snafu(display(
        "color image is {color_width}x{color_height}, but alpha image is {alpha_width}x{alpha_height}"
    ))]
    DimensionMismatch {
        color_width: u32,
        color_height: u32,
        alpha_width: u32,
        alpha_height: u32,
    },

    #[snafu(display("{width}x{height} image needs {expected} bytes, but {len} were given"))]
    InvalidPixelCount {
        width: u32,
        height: u32,
        expected: usize,
        len: usize,
    },
}

/// Opacity encoded by a mask color.
#[inline]
pub fn mask_alpha([r, g, b]: [u8; 3]) -> u8 {
    let sum = u16::from(r) + u16::from(g) + u16::from(b);
    255 - (sum / 3) as u8
}

/// Checks that a `width * height` buffer of `depth` byte pixels is `len` bytes long.
fn check_len(width: u32, height: u32, depth: usize, len: usize) -> Result<(), ComposeError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|count| count.checked_mul(depth));
    ensure!(
        expected == Some(len),
        InvalidPixelCountSnafu {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            len,
        }
    );
    Ok(())
}

/// Merges a color image and its alpha mask into RGBA pixels.
pub fn compose(color: &TrueColorImage, alpha: &PaletteImage) -> Result<Vec<u8>, ComposeError> {
    ensure!(
        color.width == alpha.width && color.height == alpha.height,
        DimensionMismatchSnafu {
            color_width: color.width,
            color_height: color.height,
            alpha_width: alpha.width,
            alpha_height: alpha.height,
        }
    );
    check_len(color.width, color.height, 3, color.pixels.len())?;
    check_len(alpha.width, alpha.height, 1, alpha.indices.len())?;

    let mut rgba = Vec::with_capacity(alpha.indices.len() * 4);
    for (bgr, &index) in izip!(color.pixels.chunks_exact(3), &alpha.indices) {
        let a = mask_alpha(alpha.palette.get(index));
        rgba.extend_from_slice(&[bgr[2], bgr[1], bgr[0], a]);
    }

    Ok(rgba)
}

/// Splits RGBA pixels into a color image and an alpha mask with a grayscale palette.
///
/// Each mask index is the inverted alpha, so composing the pair gives back the input exactly.
pub fn split_alpha(
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<(TrueColorImage, PaletteImage), ComposeError> {
    check_len(width, height, 4, rgba.len())?;

    let pixel_count = rgba.len() / 4;
    let mut bgr = Vec::with_capacity(pixel_count * 3);
    let mut indices = Vec::with_capacity(pixel_count);
    for pixel in rgba.chunks_exact(4) {
        bgr.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        indices.push(!pixel[3]);
    }

    let color = TrueColorImage {
        width,
        height,
        pixels: bgr,
    };
    let alpha = PaletteImage {
        width,
        height,
        indices,
        palette: Palette::grayscale(),
    };

    Ok((color, alpha))
}

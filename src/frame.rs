//! Frame resampling: scale a raw RGB frame to the output width and derive its luminance.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::FrameError;

/// A full-resolution RGB frame as handed over by a frame source.
#[derive(Debug, Clone)]
pub struct RawFrame {
    image: RgbImage,
}

impl RawFrame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed row-major RGB bytes.
    ///
    /// `index` is the frame's position in its source and only used for error reporting.
    pub fn from_raw(index: usize, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        let got = data.len();
        let image = RgbImage::from_raw(width, height, data).filter(|_| got == expected).ok_or_else(|| FrameError::DecodeFailure {
            index,
            reason: format!("expected {} bytes for a {}x{} RGB frame, got {}", expected, width, height, got),
        })?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}

/// An RGB frame scaled to the output grid. Both dimensions are at least 1.
#[derive(Debug, Clone)]
pub struct ResampledFrame {
    image: RgbImage,
}

impl ResampledFrame {
    /// Wrap an already-sized image. Fails on an empty image.
    pub fn from_image(image: RgbImage) -> Result<Self, FrameError> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}

/// Single-channel intensity grid, same size as the [`ResampledFrame`] it came from.
#[derive(Debug, Clone)]
pub struct LuminanceFrame {
    image: GrayImage,
}

impl LuminanceFrame {
    pub fn from_image(image: GrayImage) -> Result<Self, FrameError> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Output height for a frame of `orig_w`x`orig_h` scaled to `target_w` columns.
///
/// `round(target_w * orig_h / orig_w)`, never less than 1. Callers guarantee `orig_w > 0`.
pub fn target_height(orig_w: u32, orig_h: u32, target_w: u32) -> u32 {
    // u128 holds 2 * u32::MAX * u32::MAX + u32::MAX without overflow
    let num = 2 * u128::from(target_w) * u128::from(orig_h) + u128::from(orig_w);
    let h = num / (2 * u128::from(orig_w));
    u32::try_from(h).unwrap_or(u32::MAX).max(1)
}

/// Scale `raw` to exactly `target_width` columns, keeping its aspect ratio.
pub fn resample(raw: &RawFrame, target_width: u32) -> Result<ResampledFrame, FrameError> {
    let (orig_w, orig_h) = raw.image.dimensions();
    check_dimensions(orig_w, orig_h)?;
    if target_width == 0 {
        return Err(FrameError::InvalidDimensions { width: 0, height: orig_h });
    }

    let target_h = target_height(orig_w, orig_h, target_width);
    let image = if (target_width, target_h) == (orig_w, orig_h) {
        raw.image.clone()
    } else {
        imageops::resize(&raw.image, target_width, target_h, FilterType::Triangle)
    };
    Ok(ResampledFrame { image })
}

/// ITU-R 601 luma, rounded to nearest.
fn luminance(rgb: Rgb<u8>) -> u8 {
    let r = u32::from(rgb[0]);
    let g = u32::from(rgb[1]);
    let b = u32::from(rgb[2]);
    // weights sum to 1000, so the result is at most 255
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}

pub fn grayscale(frame: &ResampledFrame) -> LuminanceFrame {
    let img = &frame.image;
    let image = GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([luminance(*img.get_pixel(x, y))]));
    LuminanceFrame { image }
}

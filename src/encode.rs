//! Frame encoding: luminance to glyphs, true color to 3-3-2 palette codes.
//!
//! The ramp, the divisor and the palettes are shared with the players that
//! consume the generated arrays and must not change.

use std::fmt;

use image::Rgb;

use crate::error::FrameError;
use crate::frame::{grayscale, resample, LuminanceFrame, RawFrame, ResampledFrame};

/// Glyphs in order of increasing luminance.
pub const GLYPH_RAMP: [char; 11] = ['@', '#', 'S', '%', '?', '*', '+', ';', ':', ',', '.'];

/// Luminance span covered by one ramp entry. `255 / 25 == 10`, the last ramp index.
pub const GLYPH_STEP: u8 = 25;

pub const RED_LEVELS: [u8; 8] = [0, 36, 72, 109, 145, 182, 218, 255];
pub const GREEN_LEVELS: [u8; 8] = [0, 36, 72, 109, 145, 182, 218, 255];
pub const BLUE_LEVELS: [u8; 4] = [0, 85, 170, 255];

pub fn glyph_index(luma: u8) -> usize {
    usize::from(luma / GLYPH_STEP)
}

pub fn glyph_for(luma: u8) -> char {
    GLYPH_RAMP[glyph_index(luma)]
}

/// Index of the level closest to `value`; the earliest level wins a tie.
fn nearest_level(levels: &[u8], value: u8) -> u8 {
    levels
        .iter()
        .enumerate()
        .min_by_key(|(_, level)| level.abs_diff(value))
        .map_or(0, |(idx, _)| idx as u8)
}

/// An 8-bit color: 3 bits red index, 3 bits green index, 2 bits blue index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorCode(u8);

impl ColorCode {
    /// Pack palette indices. Indices past the palette size are masked off.
    pub fn pack(red_idx: u8, green_idx: u8, blue_idx: u8) -> Self {
        Self(((red_idx & 0x07) << 5) | ((green_idx & 0x07) << 2) | (blue_idx & 0x03))
    }

    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn red_index(self) -> u8 {
        (self.0 & 0xe0) >> 5
    }

    pub fn green_index(self) -> u8 {
        (self.0 & 0x1c) >> 2
    }

    pub fn blue_index(self) -> u8 {
        self.0 & 0x03
    }

    /// Palette color this code stands for.
    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb([
            RED_LEVELS[usize::from(self.red_index())],
            GREEN_LEVELS[usize::from(self.green_index())],
            BLUE_LEVELS[usize::from(self.blue_index())],
        ])
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Quantize a true-color pixel to its nearest 3-3-2 palette entry, channel by channel.
pub fn quantize(px: Rgb<u8>) -> ColorCode {
    ColorCode::pack(
        nearest_level(&RED_LEVELS, px[0]),
        nearest_level(&GREEN_LEVELS, px[1]),
        nearest_level(&BLUE_LEVELS, px[2]),
    )
}

/// One output cell. Renders as its 3-character token, e.g. `.1a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub color: ColorCode,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.glyph, self.color)
    }
}

/// A fully encoded frame, cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl EncodedFrame {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks_exact(self.width as usize)
    }

    /// Token string for row `y`: every cell's glyph and hex code, no separators.
    pub fn row_string(&self, y: u32) -> Option<String> {
        self.rows().nth(y as usize).map(row_tokens)
    }

    /// Glyphs only, one line per row.
    pub fn glyph_text(&self) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for row in self.rows() {
            out.extend(row.iter().map(|cell| cell.glyph));
            out.push('\n');
        }
        out
    }
}

pub(crate) fn row_tokens(row: &[Cell]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(row.len() * 3);
    for cell in row {
        // writing into a String cannot fail
        let _ = write!(out, "{}", cell);
    }
    out
}

/// Pair each luminance sample with the quantized color of the same pixel.
pub fn encode(luminance: &LuminanceFrame, colors: &ResampledFrame) -> Result<EncodedFrame, FrameError> {
    if luminance.dimensions() != colors.dimensions() {
        return Err(FrameError::DimensionMismatch { luminance: luminance.dimensions(), colors: colors.dimensions() });
    }

    let (width, height) = colors.dimensions();
    let mut cells = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            cells.push(Cell { glyph: glyph_for(luminance.value(x, y)), color: quantize(colors.pixel(x, y)) });
        }
    }
    Ok(EncodedFrame { width, height, cells })
}

/// Resample, grayscale and encode one raw frame.
pub fn convert_frame(raw: &RawFrame, width: u32) -> Result<EncodedFrame, FrameError> {
    let resampled = resample(raw, width)?;
    let luma = grayscale(&resampled);
    encode(&luma, &resampled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn glyph_index_is_floor_div_25_within_ramp() {
        for v in 0..=255u8 {
            assert_eq!(glyph_index(v), usize::from(v) / 25);
            assert!(glyph_index(v) <= 10);
        }
        assert_eq!(glyph_for(0), '@');
        assert_eq!(glyph_for(24), '@');
        assert_eq!(glyph_for(25), '#');
        assert_eq!(glyph_for(100), '?');
        assert_eq!(glyph_for(249), ',');
        assert_eq!(glyph_for(250), '.');
        assert_eq!(glyph_for(255), '.');
    }

    #[test]
    fn ties_go_to_the_first_level() {
        assert_eq!(nearest_level(&RED_LEVELS, 18), 0);
        assert_eq!(nearest_level(&RED_LEVELS, 19), 1);
        assert_eq!(nearest_level(&RED_LEVELS, 54), 1);
        assert_eq!(nearest_level(&BLUE_LEVELS, 42), 0);
        assert_eq!(nearest_level(&BLUE_LEVELS, 43), 1);
        assert_eq!(nearest_level(&BLUE_LEVELS, 255), 3);
    }

    #[test]
    fn packing_layout_is_3_3_2() {
        assert_eq!(quantize(Rgb([255, 255, 255])).byte(), 0xff);
        assert_eq!(quantize(Rgb([0, 0, 0])).byte(), 0x00);
        assert_eq!(quantize(Rgb([255, 0, 0])).byte(), 0xe0);
        assert_eq!(quantize(Rgb([0, 255, 0])).byte(), 0x1c);
        assert_eq!(quantize(Rgb([0, 0, 255])).byte(), 0x03);
        let code = ColorCode::pack(5, 2, 1);
        assert_eq!((code.red_index(), code.green_index(), code.blue_index()), (5, 2, 1));
        assert_eq!(code.to_string(), "a9");
        assert_eq!(ColorCode::from_byte(0x1a).to_string(), "1a");
    }

    #[test]
    fn decoded_color_stays_within_palette_granularity() {
        for r in (0..=255u8).step_by(3) {
            for g in (0..=255u8).step_by(5) {
                for b in 0..=255u8 {
                    let back = quantize(Rgb([r, g, b])).to_rgb();
                    assert!(back[0].abs_diff(r) <= 18, "red {} -> {}", r, back[0]);
                    assert!(back[1].abs_diff(g) <= 18, "green {} -> {}", g, back[1]);
                    assert!(back[2].abs_diff(b) <= 42, "blue {} -> {}", b, back[2]);
                }
            }
        }
    }

    #[test]
    fn quantizing_palette_colors_is_idempotent() {
        for r in 0..8u8 {
            for g in 0..8u8 {
                for b in 0..4u8 {
                    let code = ColorCode::pack(r, g, b);
                    assert_eq!(quantize(code.to_rgb()), code);
                    assert_eq!(quantize(quantize(code.to_rgb()).to_rgb()), code);
                }
            }
        }
    }

    #[test]
    fn two_pixel_frame_encodes_to_known_tokens() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        let encoded = convert_frame(&RawFrame::new(img), 2).unwrap();
        assert_eq!((encoded.width(), encoded.height()), (2, 1));
        assert_eq!(encoded.cell(0, 0).map(|c| c.glyph), Some('.'));
        assert_eq!(encoded.cell(1, 0).map(|c| c.color.byte()), Some(0x00));
        assert_eq!(encoded.row_string(0).as_deref(), Some(".ff@00"));
        assert_eq!(encoded.row_string(1), None);
        assert_eq!(encoded.glyph_text(), ".@\n");
    }

    #[test]
    fn mismatched_grids_are_refused() {
        let luma = LuminanceFrame::from_image(GrayImage::from_pixel(2, 2, Luma([10]))).unwrap();
        let colors = ResampledFrame::from_image(RgbImage::new(3, 2)).unwrap();
        let err = encode(&luma, &colors).unwrap_err();
        assert!(matches!(err, FrameError::DimensionMismatch { luminance: (2, 2), colors: (3, 2) }));
    }

    #[test]
    fn rows_come_out_top_to_bottom() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 1, Rgb([255, 255, 255]));
        let resampled = ResampledFrame::from_image(img).unwrap();
        let encoded = encode(&grayscale(&resampled), &resampled).unwrap();
        let rows: Vec<String> = encoded.rows().map(row_tokens).collect();
        assert_eq!(rows, vec!["@00@00".to_string(), ".ff@00".to_string()]);
    }
}

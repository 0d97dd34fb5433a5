//! # asciivid - Video to colored ASCII frames
//!
//! `asciivid` converts the frames of a video into colorized ASCII art and
//! emits them as a JavaScript array literal that a browser or terminal
//! player can loop through.
//!
//! ## Features
//!
//! - Resample each frame to a fixed number of columns, keeping its aspect ratio
//! - Map luminance onto an 11-glyph ramp
//! - Quantize every cell's color to a single 3-3-2 byte
//! - Read video through `ffmpeg`, or a directory of PNG/JPEG stills
//! - Progress reporting for integration with UI applications
//!
//! Each cell is written as its glyph followed by two lowercase hex digits
//! of its color code, e.g. `.ff` for a bright white cell.
//!
//! ## Example
//!
//! ```no_run
//! use asciivid::{convert_file, ConversionOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ConversionOptions::default().with_width(80).with_skip(2);
//! let summary = convert_file(
//!     Path::new("input.mp4"),
//!     Path::new("frames.js"),
//!     "frames",
//!     &options,
//!     |progress| println!("{}", progress.message),
//! )?;
//! println!("wrote {} frames", summary.frames_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Single frames
//!
//! ```
//! use asciivid::{convert_frame, RawFrame};
//! use image::{Rgb, RgbImage};
//!
//! let mut img = RgbImage::new(2, 1);
//! img.put_pixel(0, 0, Rgb([255, 255, 255]));
//! img.put_pixel(1, 0, Rgb([0, 0, 0]));
//! let encoded = convert_frame(&RawFrame::new(img), 2).unwrap();
//! assert_eq!(encoded.row_string(0).as_deref(), Some(".ff@00"));
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod frame;
pub mod output;
pub mod pipeline;
pub mod source;

pub use config::{AppConfig, Preset};
pub use encode::{convert_frame, encode, glyph_for, quantize, Cell, ColorCode, EncodedFrame, GLYPH_RAMP};
pub use error::FrameError;
pub use frame::{grayscale, resample, LuminanceFrame, RawFrame, ResampledFrame};
pub use output::ArrayWriter;
pub use pipeline::{convert, convert_file, ConversionOptions, ConversionSummary, Progress, ProgressPhase};
pub use source::{open_source, FfmpegSource, FrameSource, ImageSequence, MemorySource};

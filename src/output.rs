//! The JavaScript array literal the players load:
//!
//! ```text
//! var frames = [
//! ['.ff@00',],['@00.ff',],]
//! ```

use anyhow::{bail, Result};
use std::io::{self, Write};

use crate::encode::{row_tokens, EncodedFrame};

/// Whether `name` can be used as the declared variable name.
pub fn is_valid_list_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Render one frame as `[` + quoted, comma-terminated rows + `],`.
pub fn frame_literal(frame: &EncodedFrame) -> String {
    let mut out = String::with_capacity(frame.height() as usize * (frame.width() as usize * 3 + 3) + 2);
    out.push('[');
    for row in frame.rows() {
        out.push('\'');
        out.push_str(&row_tokens(row));
        out.push_str("',");
    }
    out.push_str("],");
    out
}

/// Append-only writer for the frame array. Each frame is written whole or not at all.
pub struct ArrayWriter<W: Write> {
    out: W,
    frames: usize,
}

impl<W: Write> ArrayWriter<W> {
    /// Write the `var <list_name> = [` header.
    pub fn begin(mut out: W, list_name: &str) -> Result<Self> {
        if !is_valid_list_name(list_name) {
            bail!("'{}' is not a valid JavaScript identifier", list_name);
        }
        writeln!(out, "var {} = [", list_name)?;
        Ok(Self { out, frames: 0 })
    }

    pub fn write_frame(&mut self, frame: &EncodedFrame) -> io::Result<()> {
        self.out.write_all(frame_literal(frame).as_bytes())?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    /// Close the outer list and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.write_all(b"]")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::convert_frame;
    use crate::frame::RawFrame;
    use image::{Rgb, RgbImage};

    fn white_black() -> EncodedFrame {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        convert_frame(&RawFrame::new(img), 2).unwrap()
    }

    #[test]
    fn list_names_follow_identifier_rules() {
        for ok in ["frames", "_f", "$anim", "clip2", "A_b$9"] {
            assert!(is_valid_list_name(ok), "{}", ok);
        }
        for bad in ["", "2clip", "my-frames", "a b", "x;alert(1)", "é"] {
            assert!(!is_valid_list_name(bad), "{}", bad);
        }
    }

    #[test]
    fn writes_exact_literal() {
        let frame = white_black();
        let mut writer = ArrayWriter::begin(Vec::new(), "ascii").unwrap();
        writer.write_frame(&frame).unwrap();
        writer.write_frame(&frame).unwrap();
        assert_eq!(writer.frames_written(), 2);
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(text, "var ascii = [\n['.ff@00',],['.ff@00',],]");
    }

    #[test]
    fn empty_run_is_still_a_valid_array() {
        let writer = ArrayWriter::begin(Vec::new(), "empty").unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(text, "var empty = [\n]");
    }

    #[test]
    fn bad_list_name_writes_nothing() {
        let mut sink = Vec::new();
        assert!(ArrayWriter::begin(&mut sink, "not-valid").is_err());
        assert!(sink.is_empty());
    }
}

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::encode::convert_frame;
use crate::output::{is_valid_list_name, ArrayWriter};
use crate::source::{open_source, FrameSource};

/// Represents the current phase of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Encoding frames and appending them to the output
    ConvertingFrames,
    /// Conversion completed successfully
    Complete,
}

/// Progress information handed to the observer after every written frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion
    pub phase: ProgressPhase,
    /// Number of frames written so far
    pub completed: usize,
    /// Expected number of frames to write (0 if unknown)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    pub fn converting_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            ((completed as f64 / total as f64) * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::ConvertingFrames,
            completed,
            total,
            percentage,
            message: format!("Converting frame {} of {}", completed, total),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Conversion complete: {} frames", total_frames),
        }
    }
}

/// Options for a conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Output width in characters
    pub width: u32,
    /// Stop after this many frames have been written; `None` converts everything
    pub num_frames: Option<usize>,
    /// Keep every `skip`-th frame of the source, starting with the first
    pub skip: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self { width: 100, num_frames: None, skip: 1 }
    }
}

impl ConversionOptions {
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_num_frames(mut self, num_frames: Option<usize>) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            bail!("width must be at least 1");
        }
        if self.skip == 0 {
            bail!("skip must be at least 1");
        }
        Ok(())
    }

    /// Whether the frame at source position `index` (0-based) is kept.
    pub fn selects(&self, index: usize) -> bool {
        index % self.skip == 0
    }

    /// How many frames a run is expected to write, given the source's estimate.
    pub fn expected_frames(&self, source_frames: Option<usize>) -> Option<usize> {
        let kept = source_frames.map(|n| n.div_ceil(self.skip.max(1)));
        match (kept, self.num_frames) {
            (Some(kept), Some(limit)) => Some(kept.min(limit)),
            (kept, limit) => kept.or(limit),
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Frames pulled from the source, skipped ones included
    pub frames_read: usize,
    /// Frames encoded and appended to the output
    pub frames_written: usize,
    /// Selected frames lost to a decode or dimension failure
    pub frames_dropped: usize,
}

/// Pull frames from `source`, encode the selected ones and append them to `writer`.
///
/// `options.num_frames` limits frames *written*: frames passed over by `skip`
/// or dropped after a recoverable failure do not count toward it.
pub fn convert<S, W, F>(source: &mut S, writer: &mut ArrayWriter<W>, options: &ConversionOptions, progress_callback: F) -> Result<ConversionSummary>
where
    S: FrameSource + ?Sized,
    W: Write,
    F: Fn(Progress),
{
    options.validate()?;
    let total = options.expected_frames(source.frame_count_hint()).unwrap_or(0);
    let mut summary = ConversionSummary::default();

    progress_callback(Progress::converting_frames(0, total));

    while options.num_frames.map_or(true, |limit| summary.frames_written < limit) {
        let index = summary.frames_read;

        if !options.selects(index) {
            match source.skip_frame() {
                None => break,
                Some(Ok(())) => {}
                Some(Err(e)) if e.is_recoverable() => log::debug!("unreadable frame {} passed over: {}", index, e),
                Some(Err(e)) => return Err(anyhow!(e).context(format!("reading frame {}", index))),
            }
            summary.frames_read += 1;
            continue;
        }

        let Some(next) = source.next_frame() else { break };
        summary.frames_read += 1;

        match next.and_then(|raw| convert_frame(&raw, options.width)) {
            Ok(encoded) => {
                writer.write_frame(&encoded).with_context(|| format!("writing frame {}", index))?;
                summary.frames_written += 1;
                log::debug!("frame {} encoded as {}x{}", index, encoded.width(), encoded.height());
                progress_callback(Progress::converting_frames(summary.frames_written, total));
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("dropping frame {}: {}", index, e);
                summary.frames_dropped += 1;
            }
            Err(e) => return Err(anyhow!(e).context(format!("converting frame {}", index))),
        }
    }

    progress_callback(Progress::complete(summary.frames_written));
    log::info!(
        "read {} frames, wrote {}, dropped {}",
        summary.frames_read,
        summary.frames_written,
        summary.frames_dropped
    );
    Ok(summary)
}

/// Convert `input` (a video file, a still, or a directory of stills) into the
/// array literal `list_name`, written to `output`.
///
/// Options, list name and source are all checked before the output file is
/// created, so a bad run leaves no output behind.
pub fn convert_file<F>(input: &Path, output: &Path, list_name: &str, options: &ConversionOptions, progress_callback: F) -> Result<ConversionSummary>
where
    F: Fn(Progress),
{
    options.validate()?;
    if !is_valid_list_name(list_name) {
        bail!("'{}' is not a valid JavaScript identifier", list_name);
    }
    let mut source = open_source(input)?;
    let file = fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = ArrayWriter::begin(BufWriter::new(file), list_name)?;

    let summary = convert(&mut source, &mut writer, options, progress_callback)?;
    writer.finish().with_context(|| format!("writing {}", output.display()))?;
    Ok(summary)
}

//! Frame sources: where raw frames come from.
//!
//! Decoding is never done here. Video goes through an `ffmpeg` child process
//! writing packed `rgb24` frames to a pipe; stills go through the `image` crate.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command as ProcCommand, Stdio};
use walkdir::WalkDir;

use crate::error::FrameError;
use crate::frame::RawFrame;

/// A sequential, finite, non-restartable producer of raw frames.
pub trait FrameSource {
    /// Estimated total number of frames, `None` when unknown.
    fn frame_count_hint(&self) -> Option<usize>;

    /// Pull the next frame. `None` means the source is exhausted.
    fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>>;

    /// Move past the next frame without keeping it.
    fn skip_frame(&mut self) -> Option<Result<(), FrameError>> {
        self.next_frame().map(|frame| frame.map(|_| ()))
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_count_hint(&self) -> Option<usize> {
        (**self).frame_count_hint()
    }

    fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>> {
        (**self).next_frame()
    }

    fn skip_frame(&mut self) -> Option<Result<(), FrameError>> {
        (**self).skip_frame()
    }
}

/// Open the right source for `input`: a directory or still image is read as an
/// image sequence, anything else is handed to ffmpeg.
pub fn open_source(input: &Path) -> Result<Box<dyn FrameSource>> {
    if input.is_dir() {
        return Ok(Box::new(ImageSequence::open(input)?));
    }
    if !input.is_file() {
        bail!("Input path does not exist: {}", input.display());
    }
    if is_still_image(input) {
        return Ok(Box::new(ImageSequence::from_paths(vec![input.to_path_buf()])));
    }
    Ok(Box::new(FfmpegSource::open(input)?))
}

fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
}

/// Stream geometry and length as reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den > 0.0 && num > 0.0).then(|| num / den)
}

/// Parse `ffprobe -print_format json -show_streams` output for the first video stream.
///
/// The frame count is taken from `nb_frames` when the container records it,
/// otherwise estimated from duration and frame rate.
pub fn parse_probe(json: &[u8]) -> Result<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json).context("parsing ffprobe output")?;
    let stream = probe.streams.into_iter().next().ok_or_else(|| anyhow!("No video stream found"))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => bail!("Video stream has no usable dimensions"),
    };

    let counted = stream.nb_frames.as_deref().and_then(|n| n.trim().parse::<usize>().ok()).filter(|&n| n > 0);
    let estimated = || {
        let secs: f64 = stream.duration.as_deref()?.trim().parse().ok()?;
        let fps = parse_rate(stream.r_frame_rate.as_deref()?)?;
        let n = (secs * fps).round();
        (n >= 1.0).then_some(n as usize)
    };

    Ok(VideoInfo { width, height, frame_count: counted.or_else(estimated) })
}

/// Ask ffprobe for the first video stream's dimensions and frame count.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = ProcCommand::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "v:0"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .context("running ffprobe (is it installed and on PATH?)")?;

    if !output.status.success() {
        bail!("ffprobe could not read {}", path.display());
    }

    let info = parse_probe(&output.stdout).with_context(|| format!("probing {}", path.display()))?;
    log::info!("probed {}: {}x{}, {:?} frames", path.display(), info.width, info.height, info.frame_count);
    Ok(info)
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Decode the first video stream of `path` to packed `rgb24` on stdout.
///
/// The stream is pinned with `-map` and scaled to the probed geometry so every
/// frame on the pipe is exactly `width * height * 3` bytes.
fn ffmpeg_args(path: &Path, info: VideoInfo) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-loglevel", "error", "-noautorotate", "-i"].iter().map(OsString::from).collect();
    args.push(path.as_os_str().to_owned());
    args.extend(["-map", "0:v:0", "-an", "-vf"].iter().map(OsString::from));
    args.push(format!("scale={}:{}", info.width, info.height).into());
    args.extend(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"].iter().map(OsString::from));
    args
}

/// Video frames decoded by an `ffmpeg` child process at native resolution.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    info: VideoInfo,
    frame_len: usize,
    index: usize,
    finished: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe_video(path)?;
        Self::spawn(path, info)
    }

    fn spawn(path: &Path, info: VideoInfo) -> Result<Self> {
        let mut child = ProcCommand::new("ffmpeg")
            .args(ffmpeg_args(path, info))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .context("running ffmpeg (is it installed and on PATH?)")?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("ffmpeg stdout was not captured"))?;
        log::debug!("ffmpeg decoding {} as {}x{} rgb24", path.display(), info.width, info.height);

        Ok(Self {
            child,
            stdout,
            info,
            frame_len: info.width as usize * info.height as usize * 3,
            index: 0,
            finished: false,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    fn abort(&mut self) {
        if let Err(e) = self.child.kill() {
            log::debug!("killing ffmpeg: {}", e);
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.finished = true;
        match self.child.wait() {
            Ok(status) if !status.success() => log::warn!("ffmpeg exited with {}", status),
            Ok(_) => {}
            Err(e) => log::warn!("waiting for ffmpeg: {}", e),
        }
    }
}

impl FrameSource for FfmpegSource {
    fn frame_count_hint(&self) -> Option<usize> {
        self.info.frame_count
    }

    fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>> {
        if self.finished {
            return None;
        }
        let mut buf = vec![0u8; self.frame_len];
        let got = match read_full(&mut self.stdout, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.abort();
                return Some(Err(e.into()));
            }
        };
        let index = self.index;
        self.index += 1;

        if got == 0 {
            self.finish();
            return None;
        }
        if got < self.frame_len {
            // a truncated tail frame is the last thing ffmpeg will send
            self.finish();
            return Some(Err(FrameError::DecodeFailure {
                index,
                reason: format!("stream ended after {} of {} bytes", got, self.frame_len),
            }));
        }
        Some(RawFrame::from_raw(index, self.info.width, self.info.height, buf))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Still images read in file-name order, one frame per file.
#[derive(Debug)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    /// Collect every PNG/JPEG directly inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_still_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("No PNG or JPEG frames found in {}", dir.display());
        }
        log::info!("reading {} still frames from {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }
}

impl FrameSource for ImageSequence {
    fn frame_count_hint(&self) -> Option<usize> {
        Some(self.paths.len())
    }

    fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>> {
        let index = self.next;
        let path = self.paths.get(index)?;
        self.next += 1;
        let frame = image::open(path)
            .map(|img| RawFrame::new(img.to_rgb8()))
            .map_err(|e| FrameError::DecodeFailure { index, reason: format!("{}: {}", path.display(), e) });
        Some(frame)
    }

    fn skip_frame(&mut self) -> Option<Result<(), FrameError>> {
        self.paths.get(self.next)?;
        self.next += 1;
        Some(Ok(()))
    }
}

/// Frames (or per-frame failures) already held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Result<RawFrame, FrameError>>,
}

impl MemorySource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self { frames: frames.into_iter().map(Ok).collect() }
    }

    pub fn from_results(frames: Vec<Result<RawFrame, FrameError>>) -> Self {
        Self { frames: frames.into() }
    }
}

impl FrameSource for MemorySource {
    fn frame_count_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn next_frame(&mut self) -> Option<Result<RawFrame, FrameError>> {
        self.frames.pop_front()
    }
}

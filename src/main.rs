use anyhow::{anyhow, bail, Context, Result};
use asciivid::output::is_valid_list_name;
use asciivid::{convert, open_source, AppConfig, ArrayWriter, ConversionOptions, FrameSource, Progress, ProgressPhase};
use clap::Parser;
use dialoguer::{Confirm, FuzzySelect, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(version, about = "Convert a video into colored ASCII frames written as a JavaScript array.")]
struct Args {
    /// Input video file, still image, or directory of PNG/JPEG frames
    input: Option<PathBuf>,

    /// Output file for the generated array
    output: Option<PathBuf>,

    /// Name of the output JavaScript array
    list_name: Option<String>,

    /// Width (in characters) of the output
    #[arg(short, long)]
    width: Option<u32>,

    /// Number of frames to convert, -1 for all
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    num_frames: Option<i64>,

    /// Keep every Nth frame of the source, starting with the first
    #[arg(short, long)]
    skip: Option<usize>,

    /// Use the configured default preset without prompting
    #[arg(long, default_value_t = false, conflicts_with_all = &["small", "large"])]
    default: bool,

    /// Use the small preset without prompting
    #[arg(long, default_value_t = false, conflicts_with_all = &["default", "large"])]
    small: bool,

    /// Use the large preset without prompting
    #[arg(long, default_value_t = false, conflicts_with_all = &["default", "small"])]
    large: bool,

    /// Overwrite an existing output file without asking
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,

    /// Suppress the banner and progress bar
    #[arg(long, short, default_value_t = false)]
    quiet: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: log::LevelFilter,
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    env_logger::Builder::new().filter_level(args.log_level).init();

    let preset_flag = args.default || args.small || args.large;
    let is_interactive = !preset_flag && std::io::stdin().is_terminal();

    let cfg = AppConfig::load()?;
    let active_preset_name = if args.small {
        "small"
    } else if args.large {
        "large"
    } else {
        cfg.default_preset.as_str()
    };
    let active = cfg.preset(active_preset_name)?;

    // --- Interactive Prompts ---
    let input_picked = args.input.is_none();
    if input_picked {
        if !is_interactive {
            bail!("Input file must be provided when not running interactively.");
        }
        let files = find_media_files();
        if files.is_empty() {
            bail!("No media files found in current directory.");
        }
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose an input file")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }
    let input_path = args.input.clone().ok_or_else(|| anyhow!("no input selected"))?;

    if is_interactive {
        if args.output.is_none() {
            let suggested: String = default_output_path(&input_path).to_string_lossy().into_owned();
            let chosen: String = Input::new().with_prompt("Output file").default(suggested).interact_text()?;
            args.output = Some(PathBuf::from(chosen));
        }
        if args.list_name.is_none() {
            args.list_name = Some(Input::new().with_prompt("Array name").default(cfg.list_name.clone()).interact_text()?);
        }
        if prompts_for_width(input_picked, args.width) {
            args.width = Some(Input::new().with_prompt("Width (characters)").default(active.width).interact()?);
        }
    }

    let output_path = args.output.clone().unwrap_or_else(|| default_output_path(&input_path));
    let list_name = args.list_name.clone().unwrap_or_else(|| cfg.list_name.clone());
    let options = ConversionOptions::default()
        .with_width(args.width.unwrap_or(active.width))
        .with_skip(args.skip.unwrap_or(active.skip))
        .with_num_frames(parse_num_frames(args.num_frames)?);
    options.validate()?;
    if !is_valid_list_name(&list_name) {
        bail!("'{}' is not a valid JavaScript identifier", list_name);
    }

    // --- Execution ---
    let mut source = open_source(&input_path).with_context(|| format!("opening {}", input_path.display()))?;

    if output_path.exists()
        && is_interactive
        && !args.yes
        && !Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output_path.display()))
            .default(false)
            .interact()?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let expected = options.expected_frames(source.frame_count_hint());
    if !args.quiet {
        print_banner(&[
            ("Input", input_path.display().to_string()),
            ("Output", output_path.display().to_string()),
            ("List", list_name.clone()),
            ("Width", options.width.to_string()),
            ("# frames", expected.map_or_else(|| "all".to_string(), |n| n.to_string())),
            ("Skip", options.skip.to_string()),
        ]);
    }

    let file = fs::File::create(&output_path).with_context(|| format!("creating {}", output_path.display()))?;
    let mut writer = ArrayWriter::begin(BufWriter::new(file), &list_name)?;

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        match expected {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} ({percent}%)")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        }
    };
    pb.set_message("Converting frames");

    let summary = convert(&mut source, &mut writer, &options, |progress: Progress| match progress.phase {
        ProgressPhase::ConvertingFrames => pb.set_position(progress.completed as u64),
        ProgressPhase::Complete => pb.finish_and_clear(),
    })?;
    writer.finish().with_context(|| format!("writing {}", output_path.display()))?;

    if !args.quiet {
        if summary.frames_dropped > 0 {
            println!("Dropped {} unreadable frames.", summary.frames_dropped);
        }
        println!("Wrote {} frames to {}", summary.frames_written, output_path.display());
        println!("Done.");
    }
    Ok(())
}

/// Width is only asked for alongside an interactively chosen input; the
/// positional form falls back to the preset width.
fn prompts_for_width(input_picked: bool, width: Option<u32>) -> bool {
    input_picked && width.is_none()
}

/// `-1` (or no value) converts every frame.
fn parse_num_frames(value: Option<i64>) -> Result<Option<usize>> {
    match value {
        None | Some(-1) => Ok(None),
        Some(n) if n >= 0 => Ok(Some(usize::try_from(n)?)),
        Some(n) => Err(anyhow!("--num-frames must be -1 or a non-negative count, got {}", n)),
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("asciivid_output");
    PathBuf::from(format!("{}.js", stem))
}

fn print_banner(rows: &[(&str, String)]) {
    let lines: Vec<String> = rows.iter().map(|(label, value)| format!("{:<11}{}", format!("{}:", label), value)).collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    println!("Video to ASCII");
    println!("{}", "-".repeat(longest));
    for line in &lines {
        println!("{}", line);
    }
    println!("{}\n", "-".repeat(longest));
}

fn find_media_files() -> Vec<String> {
    WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(
                        ext.to_str().map(str::to_ascii_lowercase).as_deref(),
                        Some("mp4" | "mkv" | "mov" | "avi" | "webm" | "gif" | "png" | "jpg" | "jpeg")
                    )
                })
        })
        .map(|e| e.path().to_str().unwrap_or("").to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_frames_sentinel_means_all() {
        assert_eq!(parse_num_frames(None).unwrap(), None);
        assert_eq!(parse_num_frames(Some(-1)).unwrap(), None);
        assert_eq!(parse_num_frames(Some(0)).unwrap(), Some(0));
        assert_eq!(parse_num_frames(Some(12)).unwrap(), Some(12));
        assert!(parse_num_frames(Some(-2)).is_err());
    }

    #[test]
    fn positional_form_parses() {
        let args = Args::try_parse_from(["asciivid", "in.mp4", "out.js", "clip", "-w", "80", "-n", "-1", "-s", "2"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("in.mp4")));
        assert_eq!(args.output, Some(PathBuf::from("out.js")));
        assert_eq!(args.list_name.as_deref(), Some("clip"));
        assert_eq!((args.width, args.num_frames, args.skip), (Some(80), Some(-1), Some(2)));
        assert_eq!(args.log_level, log::LevelFilter::Warn);
    }

    #[test]
    fn positional_form_uses_the_preset_width_without_asking() {
        let args = Args::try_parse_from(["asciivid", "in.mp4", "out.js", "frames"]).unwrap();
        assert!(!prompts_for_width(args.input.is_none(), args.width));

        let bare = Args::try_parse_from(["asciivid"]).unwrap();
        assert!(prompts_for_width(bare.input.is_none(), bare.width));
        let sized = Args::try_parse_from(["asciivid", "-w", "80"]).unwrap();
        assert!(!prompts_for_width(sized.input.is_none(), sized.width));
    }

    #[test]
    fn presets_are_exclusive() {
        assert!(Args::try_parse_from(["asciivid", "--small", "--large"]).is_err());
    }

    #[test]
    fn output_defaults_next_to_cwd() {
        assert_eq!(default_output_path(Path::new("videos/clip.mp4")), PathBuf::from("clip.js"));
        assert_eq!(default_output_path(Path::new("frames_dir")), PathBuf::from("frames_dir.js"));
    }
}

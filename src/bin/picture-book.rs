use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::{Builder, Env};
use indicatif::{ProgressBar, ProgressStyle};
use picture_book::{
    FfmpegLogLevel, FrameIndexMapper, ImageFormat, MediaFile, PictureBook, PictureBookConfig,
    PreparedPlan, ProgressCallback, ProgressInfo, StyleOverrides,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  picture-book render episode.mkv book/\n  picture-book render movie.mp4 book/ --subs movie.en.srt --format png --gray\n  picture-book plan episode.mkv --max-gap 3 --json\n  picture-book metadata episode.mkv\n  picture-book completions zsh > _picture-book";

#[derive(Debug, Parser)]
#[command(
    name = "picture-book",
    version,
    about = "Turn a video into a picture book by taking screenshots with subtitles",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// FFmpeg executable used to write the screenshots.
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

/// Options shared by `render` and `plan`.
#[derive(Debug, Args, Clone)]
struct BookOptions {
    /// Input video.
    video: PathBuf,

    /// Subtitle file (default: the video's subtitle stream is used).
    #[arg(long)]
    subs: Option<PathBuf>,

    /// Embedded subtitle track to use, counting subtitle streams from 0.
    #[arg(long)]
    subtitle_track: Option<usize>,

    /// Arguments for FFmpeg's scale filter. An empty string disables scaling.
    #[arg(long, default_value = "640:-1")]
    scale: String,

    /// Convert screenshots to grayscale.
    #[arg(long)]
    gray: bool,

    /// Maximum number of seconds between screenshots.
    #[arg(long, default_value_t = 5.0)]
    max_gap: f64,

    /// Screenshot format (jpg, png).
    #[arg(long, default_value = "jpg")]
    format: String,

    /// JPG quality, from 2 (best) to 31 (worst).
    #[arg(long, default_value_t = 2)]
    jpg_quality: u8,

    /// Custom subtitle style (ASS `KEY=VALUE` pairs separated by commas).
    #[arg(long)]
    subtitle_style: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Take the screenshots.
    #[command(
        about = "Render screenshots into a directory",
        after_help = "Examples:\n  picture-book render episode.mkv book/\n  picture-book render episode.mkv book/ --subtitle-track 1 --subtitle-style 'FontSize=28' --progress"
    )]
    Render {
        #[command(flatten)]
        book: BookOptions,

        /// Output directory for screenshots.
        out_dir: PathBuf,

        /// Replace existing screenshots in the output directory.
        #[arg(long)]
        overwrite: bool,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Show which frames would be captured, without running FFmpeg.
    #[command(
        about = "Print the screenshot plan (dry run)",
        visible_alias = "dry-run",
        after_help = "Examples:\n  picture-book plan episode.mkv\n  picture-book plan episode.mkv --subs episode.srt --json"
    )]
    Plan {
        #[command(flatten)]
        book: BookOptions,

        /// Output the plan as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata for a media file.
    #[command(
        about = "Print media metadata",
        visible_alias = "probe",
        after_help = "Examples:\n  picture-book metadata episode.mkv\n  picture-book metadata episode.mkv --json"
    )]
    Metadata {
        /// Input media path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_image_format(value: &str) -> Option<ImageFormat> {
    value.trim_start_matches('.').parse().ok()
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    value.parse().ok()
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "picture_book=debug" } else { "warn" };
    Builder::from_env(Env::default().filter_or("RUST_LOG", default_filter))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .target(env_logger::Target::Stderr)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<FfmpegLogLevel, Box<dyn std::error::Error>> {
    let level = match &global.log_level {
        Some(level) => parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?,
        None => FfmpegLogLevel::default(),
    };
    picture_book::set_ffmpeg_log_level(level);
    Ok(level)
}

fn book_config(
    options: &BookOptions,
    global: &GlobalOptions,
    log_level: FfmpegLogLevel,
) -> Result<PictureBookConfig, Box<dyn std::error::Error>> {
    let image_format = parse_image_format(&options.format)
        .ok_or(format!("unsupported --format: {} (expected jpg or png)", options.format))?;
    let style_overrides = match &options.subtitle_style {
        Some(style) => style.parse::<StyleOverrides>()?,
        None => StyleOverrides::new(),
    };

    let config = PictureBookConfig::new()
        .with_style_overrides(style_overrides)
        .with_scale(options.scale.clone())
        .with_grayscale(options.gray)
        .with_max_gap_seconds(options.max_gap)
        .with_image_format(image_format)
        .with_quality(options.jpg_quality)
        .with_subtitle_track(options.subtitle_track)
        .with_ffmpeg_log_level(log_level)
        .with_ffmpeg_program(global.ffmpeg.clone());
    config.validate()?;
    Ok(config)
}

fn print_guess(prepared: &PreparedPlan) {
    let frame_rate = prepared
        .video
        .frame_rate
        .constant()
        .map(|fps| fps.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    println!(
        "Guessing that FPS is {frame_rate} and duration is {} seconds.",
        prepared.video.duration.as_secs_f64()
    );
}

fn print_plan(prepared: &PreparedPlan, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let plan = &prepared.plan;
    let mapper = FrameIndexMapper::new(&prepared.video.frame_rate, prepared.video.frame_count)?;
    let report = plan.report();

    if json {
        let payload = json!({
            "video": {
                "duration_seconds": prepared.video.duration.as_secs_f64(),
                "fps": mapper.frames_per_second(),
                "frame_count": prepared.video.frame_count,
            },
            "subtitles": prepared.subtitle_count,
            "timestamps": plan.timestamps().iter().map(|timestamp| json!({
                "seconds": timestamp.time.as_secs_f64(),
                "frame": mapper.frame_index(timestamp),
                "reason": timestamp.reason.to_string(),
            })).collect::<Vec<_>>(),
            "frames": plan.frame_indices(),
            "output_pattern": plan.output_pattern().to_string(),
            "filter": plan.filter_expression().as_str(),
            "warnings": report.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print_guess(prepared);
    println!("Subtitles: {}", prepared.subtitle_count);
    for timestamp in plan.timestamps() {
        println!(
            "{:>12.3}s  frame {:>8}  {}",
            timestamp.time.as_secs_f64(),
            mapper.frame_index(timestamp),
            timestamp.reason,
        );
    }
    print!("{report}");
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let Some(position) = info.current_timestamp {
            self.bar.set_message(format!("{:.1}s", position.as_secs_f64()));
        }
        if info.finished {
            self.bar.finish_with_message("done");
        }
    }
}

fn warn_existing_output(out_dir: &Path, overwrite: bool) {
    if out_dir.is_dir() && overwrite {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("overwriting screenshots in {}", out_dir.display()).yellow()
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let log_level = apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Render {
            book,
            out_dir,
            overwrite,
            progress,
        } => {
            let config = book_config(&book, &cli.global, log_level)?.with_overwrite(overwrite);
            let picture_book = PictureBook::new(config);
            let prepared = picture_book.prepare(&book.video, book.subs.as_deref())?;
            print_guess(&prepared);

            let report = prepared.plan.report();
            for warning in &report.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning.yellow());
            }
            warn_existing_output(&out_dir, overwrite);

            println!("Extracting {} screenshots.", prepared.plan.frame_count());
            let picture_book = if progress {
                let terminal = TerminalProgress::new(prepared.plan.frame_count() as u64)?;
                picture_book.with_progress(Arc::new(terminal))
            } else {
                picture_book
            };

            let screenshots = picture_book.execute(&prepared.plan, &book.video, &out_dir)?;
            if cli.global.verbose {
                for path in &screenshots {
                    eprintln!("saved {}", path.display());
                }
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "Wrote {} screenshot(s) to {}",
                    screenshots.len(),
                    out_dir.display()
                )
                .green()
            );
        }
        Commands::Plan { book, json } => {
            let config = book_config(&book, &cli.global, log_level)?;
            let prepared = PictureBook::new(config).prepare(&book.video, book.subs.as_deref())?;
            print_plan(&prepared, json)?;
        }
        Commands::Metadata { input, json } => {
            let media = MediaFile::open(&input)?;
            let metadata = media.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "video": metadata.video.as_ref().map(|video| json!({
                        "width": video.width,
                        "height": video.height,
                        "fps": video.frames_per_second,
                        "frame_count": video.frame_count,
                        "codec": video.codec,
                    })),
                    "subtitle_tracks": metadata.subtitle_tracks.iter().map(|track| json!({
                        "track": track.track_index,
                        "stream": track.stream_index,
                        "codec": track.codec,
                        "language": track.language,
                    })).collect::<Vec<_>>(),
                    "default_subtitle_track": media.default_subtitle_track(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                if let Some(video) = &metadata.video {
                    println!(
                        "Video: {}x{} @ {:.3} fps, {} frames [{}]",
                        video.width,
                        video.height,
                        video.frames_per_second,
                        video.frame_count,
                        video.codec,
                    );
                }
                let default_track = media.default_subtitle_track();
                for track in &metadata.subtitle_tracks {
                    println!(
                        "Subtitle track {}: {} ({}){}",
                        track.track_index,
                        track.codec,
                        track.language.as_deref().unwrap_or("und"),
                        if default_track == Some(track.track_index) { " [default]" } else { "" },
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "picture-book", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use picture_book::{FfmpegLogLevel, ImageFormat};

    use super::{Cli, Commands, GlobalOptions, book_config, parse_image_format, parse_log_level};

    #[test]
    fn parse_image_format_aliases() {
        assert_eq!(parse_image_format("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(parse_image_format("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(parse_image_format(".png"), Some(ImageFormat::Png));
        assert_eq!(parse_image_format("gif"), None);
    }

    #[test]
    fn parse_log_level_names() {
        assert_eq!(parse_log_level("quiet"), Some(FfmpegLogLevel::Quiet));
        assert_eq!(parse_log_level("Warning"), Some(FfmpegLogLevel::Warning));
        assert_eq!(parse_log_level("warn"), Some(FfmpegLogLevel::Warning));
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn render_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["picture-book", "render", "in.mkv", "out"]).unwrap();
        let Commands::Render { book, out_dir, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(out_dir.to_str(), Some("out"));

        let config = book_config(&book, &cli.global, FfmpegLogLevel::Error).unwrap();
        assert_eq!(config, picture_book::PictureBookConfig::default());
    }

    #[test]
    fn plan_options_reach_config() {
        let cli = Cli::try_parse_from([
            "picture-book",
            "plan",
            "in.mkv",
            "--max-gap",
            "2.5",
            "--format",
            "png",
            "--gray",
            "--scale",
            "",
            "--subtitle-track",
            "1",
            "--subtitle-style",
            "FontSize=30,Outline=1",
            "--json",
        ])
        .unwrap();
        let Commands::Plan { book, json } = cli.command else {
            panic!("expected plan");
        };
        assert!(json);

        let config = book_config(&book, &cli.global, FfmpegLogLevel::Error).unwrap();
        assert_eq!(config.max_gap_seconds, 2.5);
        assert_eq!(config.image_format, ImageFormat::Png);
        assert!(config.grayscale);
        assert!(config.scale.is_empty());
        assert_eq!(config.subtitle_track, Some(1));
        assert_eq!(config.style_overrides.get("FontSize"), Some("30"));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let global = GlobalOptions::default();
        for arguments in [
            ["picture-book", "plan", "in.mkv", "--jpg-quality", "40"],
            ["picture-book", "plan", "in.mkv", "--max-gap", "0"],
            ["picture-book", "plan", "in.mkv", "--format", "bmp"],
            ["picture-book", "plan", "in.mkv", "--subtitle-style", "Bold"],
        ] {
            let cli = Cli::try_parse_from(arguments).unwrap();
            let Commands::Plan { book, .. } = cli.command else {
                panic!("expected plan");
            };
            assert!(book_config(&book, &global, FfmpegLogLevel::Error).is_err());
        }
    }
}

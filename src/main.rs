// src/main.rs
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::debug;

use vidsquash::batch::{BatchResult, BatchRunner};
use vidsquash::config::Config;
use vidsquash::encoder::{EncodeAction, EncodeJob, EncodeSummary, Encoder};
use vidsquash::error::CompressError;
use vidsquash::options::{EncoderSettings, QualityPreset};

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Compress videos to fit under an upload size limit with a two-pass
/// bitrate-targeted ffmpeg encode.
#[derive(Parser, Debug)]
#[command(name = "vidsquash", version, about)]
struct Args {
    /// Input video file, or a directory with --batch.
    #[arg(required_unless_present = "list_profiles")]
    input: Option<PathBuf>,

    /// Output file (default: <input stem>_compressed.mp4).
    output: Option<PathBuf>,

    /// Target size in MB.
    #[arg(short = 's', long = "size")]
    size: Option<f64>,

    /// Quality preset.
    #[arg(short, long, value_enum)]
    quality: Option<QualityPreset>,

    /// Named profile from the settings file.
    #[arg(short, long)]
    profile: Option<String>,

    /// List configured profiles and exit.
    #[arg(long)]
    list_profiles: bool,

    /// Treat the input as a directory and compress every video in it.
    #[arg(short, long)]
    batch: bool,

    /// Output directory for batch mode (default: <input>/compressed).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Settings file (default: config.json next to the executable).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), CompressError> {
    let config = Config::load(args.config.as_deref());

    if args.list_profiles {
        print_profiles(&config);
        return Ok(());
    }
    let input = args
        .input
        .expect("clap requires an input unless --list-profiles");

    check_dependencies()?;

    let settings = config.resolve(args.profile.as_deref(), args.size, args.quality)?;
    debug!("Resolved settings: {:?}", settings);

    let encoder = Encoder::new(EncoderSettings {
        audio_bitrate_bps: settings.audio_bitrate_bps,
        ..EncoderSettings::default()
    });

    if args.batch {
        let runner = BatchRunner::new(settings.target_size_mb, settings.quality_preset);
        let result = runner
            .run(&input, args.output_dir.as_deref(), &encoder)
            .await?;
        print_batch_summary(&result);
        // Per-file failures were reported above; the batch itself completed.
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&input));

    println!("{} {}", "Input:".blue().bold(), input.display());
    println!(
        "{} {} MB, quality {} (x264 preset {}, crf {})",
        "Target:".blue().bold(),
        settings.target_size_mb,
        settings.quality_preset,
        settings.quality_preset.speed(),
        settings.quality_preset.crf()
    );

    let job = EncodeJob {
        input,
        output: output.clone(),
        target_size_mb: settings.target_size_mb,
        preset: settings.quality_preset,
    };
    let summary = encoder.compress(&job).await?;
    print_summary(&output, &summary, encoder.settings());
    Ok(())
}

fn check_dependencies() -> Result<(), CompressError> {
    for tool in REQUIRED_TOOLS {
        if which::which(tool).is_err() {
            return Err(CompressError::MissingDependency(*tool));
        }
    }
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(format!("{}_compressed.mp4", stem))
}

fn print_profiles(config: &Config) {
    if config.profiles.is_empty() {
        println!("No profiles configured");
        return;
    }
    println!("{}", "Available profiles:".bold());
    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();
    for name in names {
        let profile = &config.profiles[name];
        let size = profile
            .target_size_mb
            .map(|mb| format!("{} MB", mb))
            .unwrap_or_else(|| "default size".to_string());
        let quality = profile
            .quality_preset
            .map(|q| q.to_string())
            .unwrap_or_else(|| "default quality".to_string());
        println!(
            "  {} - {}, {}{}",
            name.cyan(),
            size,
            quality,
            if profile.description.is_empty() {
                String::new()
            } else {
                format!(" ({})", profile.description)
            }
        );
    }
}

fn print_summary(output: &Path, summary: &EncodeSummary, settings: &EncoderSettings) {
    match summary.action {
        EncodeAction::Copied => println!(
            "{}",
            "Input was already under the target size; copied without re-encoding".green()
        ),
        EncodeAction::Encoded => println!("{}", "Compression finished!".green().bold()),
    }
    println!("{} {}", "Output:".blue().bold(), output.display());
    println!(
        "{} {:.2} MB (was {:.2} MB)",
        "Size:".blue().bold(),
        summary.output_size_mb,
        summary.input_size_mb
    );
    if summary.action == EncodeAction::Encoded {
        println!("{} {:.1}%", "Saved:".blue().bold(), summary.compression_ratio);
    }
    if summary.fits_upload_limit {
        println!(
            "{}",
            format!("Output fits under the {} MB upload limit", settings.upload_limit_mb).green()
        );
    } else {
        println!(
            "{}",
            format!(
                "Output still exceeds {} MB; try a smaller target size",
                settings.upload_limit_mb
            )
            .yellow()
        );
    }
}

fn print_batch_summary(result: &BatchResult) {
    println!();
    println!("{}", "Batch finished".bold());
    println!("{} {}", "Succeeded:".green().bold(), result.succeeded);
    if result.failed > 0 {
        println!("{} {}", "Failed:".red().bold(), result.failed);
    } else {
        println!("{} {}", "Failed:".blue().bold(), result.failed);
    }
    if result.skipped > 0 {
        println!(
            "{} {} (output already existed)",
            "Skipped:".yellow().bold(),
            result.skipped
        );
    }
}

// src/encoder.rs
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::bitrate;
use crate::error::CompressError;
use crate::file_size_mb;
use crate::options::{EncoderSettings, QualityPreset};
use crate::probe;
use crate::progress::{LineBuffer, ProgressMonitor};

/// How many trailing stderr lines a failed pass reports.
const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// x264 writes its two-pass statistics into the working directory under these
/// fixed names; running two instances from one directory is not supported.
const PASS_LOG_ARTIFACTS: &[&str] = &["ffmpeg2pass-0.log", "ffmpeg2pass-0.log.mbtree"];

#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_size_mb: f64,
    pub preset: QualityPreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeAction {
    /// Input was already within the target size and was copied verbatim.
    Copied,
    /// A two-pass encode produced the output.
    Encoded,
}

#[derive(Debug, Clone)]
pub struct EncodeSummary {
    pub action: EncodeAction,
    pub input_size_mb: f64,
    pub output_size_mb: f64,
    /// Percentage of the input size that was shed; 0 for copies.
    pub compression_ratio: f64,
    /// Whether the output fits under the advisory upload ceiling.
    pub fits_upload_limit: bool,
}

pub struct Encoder {
    settings: EncoderSettings,
}

impl Encoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Encoder { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Compresses one file towards the job's target size.
    ///
    /// Inputs already at or under the target are copied byte-for-byte instead
    /// of re-encoded: shrinking them further would only cost quality. Anything
    /// larger goes through probe, bitrate planning, and the two ffmpeg passes.
    pub async fn compress(&self, job: &EncodeJob) -> Result<EncodeSummary, CompressError> {
        if !job.input.is_file() {
            return Err(CompressError::InputNotFound(job.input.clone()));
        }

        let input_size_mb = file_size_mb(&job.input).await?;
        info!(
            "Compressing {:?} ({:.2} MB) towards {} MB",
            job.input, input_size_mb, job.target_size_mb
        );

        if let Some(parent) = job.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if input_size_mb <= job.target_size_mb {
            info!("Input is already within the target size, copying without re-encoding");
            tokio::fs::copy(&job.input, &job.output).await?;
            return Ok(self.summarize(EncodeAction::Copied, input_size_mb, input_size_mb));
        }

        let media = probe::probe(&job.input).await?;
        if media.duration_secs <= 0.0 {
            return Err(CompressError::Probe {
                path: job.input.clone(),
                reason: format!("non-positive duration {}", media.duration_secs),
            });
        }

        let video_bitrate = bitrate::video_bitrate(
            job.target_size_mb,
            media.duration_secs,
            self.settings.audio_bitrate_bps,
            self.settings.min_video_bitrate_bps,
        );
        info!(
            "Duration {:.2}s, planned video bitrate {} bps, preset {}",
            media.duration_secs,
            video_bitrate,
            job.preset.speed()
        );

        self.run_pass(job, video_bitrate, 1, media.duration_secs)
            .await?;
        self.run_pass(job, video_bitrate, 2, media.duration_secs)
            .await?;
        self.remove_pass_logs().await;

        let output_size_mb = file_size_mb(&job.output).await?;
        Ok(self.summarize(EncodeAction::Encoded, input_size_mb, output_size_mb))
    }

    fn summarize(&self, action: EncodeAction, input_size_mb: f64, output_size_mb: f64) -> EncodeSummary {
        let compression_ratio = if input_size_mb > 0.0 {
            100.0 - output_size_mb * 100.0 / input_size_mb
        } else {
            0.0
        };
        EncodeSummary {
            action,
            input_size_mb,
            output_size_mb,
            compression_ratio,
            fits_upload_limit: output_size_mb <= self.settings.upload_limit_mb,
        }
    }

    async fn run_pass(
        &self,
        job: &EncodeJob,
        video_bitrate: u64,
        pass: u8,
        duration_secs: f64,
    ) -> Result<(), CompressError> {
        let args = pass_args(
            &job.input,
            &job.output,
            video_bitrate,
            job.preset,
            pass,
            self.settings.audio_bitrate_bps,
        );
        debug!("ffmpeg arguments for pass {}: {:?}", pass, args);

        let label = if pass == 1 {
            "Pass 1/2: analyzing"
        } else {
            "Pass 2/2: encoding"
        };

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        let mut stderr = child.stderr.take().expect("stderr is piped above");

        let monitor = ProgressMonitor::start(label, duration_secs);
        let mut lines = LineBuffer::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
        let mut chunk = [0u8; 8192];
        loop {
            let read = stderr.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            for line in lines.push(&chunk[..read]) {
                observe(&monitor, &mut tail, line);
            }
        }
        if let Some(line) = lines.flush() {
            observe(&monitor, &mut tail, line);
        }

        let status = child.wait().await?;
        monitor.finish().await;

        if !status.success() {
            return Err(CompressError::Encode {
                pass,
                status,
                log_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }
        Ok(())
    }

    /// Best-effort removal of the pass-1 statistics files; leftovers are a
    /// nuisance, not a failure.
    async fn remove_pass_logs(&self) {
        for name in PASS_LOG_ARTIFACTS {
            if let Err(e) = tokio::fs::remove_file(name).await {
                debug!("Could not remove pass log {}: {}", name, e);
            }
        }
    }
}

fn observe(monitor: &ProgressMonitor, tail: &mut VecDeque<String>, line: String) {
    monitor.observe_line(&line);
    if tail.len() == DIAGNOSTIC_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

/// Command line for one encode pass. Pass 1 analyzes only: audio disabled,
/// output discarded into the platform null sink. Pass 2 writes the real file
/// with AAC audio at the reserved bitrate.
pub fn pass_args(
    input: &Path,
    output: &Path,
    video_bitrate: u64,
    preset: QualityPreset,
    pass: u8,
    audio_bitrate_bps: u64,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        video_bitrate.to_string(),
        "-pass".to_string(),
        pass.to_string(),
        "-preset".to_string(),
        preset.speed().to_string(),
    ];
    if pass == 1 {
        args.extend([
            "-an".to_string(),
            "-f".to_string(),
            "null".to_string(),
            null_sink().to_string(),
        ]);
    } else {
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", audio_bitrate_bps / 1000),
            output.display().to_string(),
        ]);
    }
    args
}

fn null_sink() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

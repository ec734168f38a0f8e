// src/progress.rs
//
// Live progress for a running ffmpeg pass. The line-consuming side publishes
// the latest elapsed time into a single-slot watch cell; a separate render
// task polls it on a fixed tick and redraws the bar. Render cadence stays
// steady no matter how bursty the subprocess output is.

use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const RENDER_INTERVAL_MS: u64 = 100;
const BAR_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}%";

static TIME_MARKER: OnceLock<Regex> = OnceLock::new();

fn time_marker() -> &'static Regex {
    TIME_MARKER.get_or_init(|| {
        Regex::new(r"time=(\d+):(\d+):(\d+(?:\.\d+)?)").expect("time marker pattern is valid")
    })
}

/// Extracts the elapsed time from one ffmpeg diagnostic line, as total
/// seconds. Most lines carry no `time=HH:MM:SS.frac` marker and yield `None`.
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let captures = time_marker().captures(line)?;
    let hours: f64 = captures[1].parse().ok()?;
    let minutes: f64 = captures[2].parse().ok()?;
    let seconds: f64 = captures[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Completion percentage, clamped to [0, 100]. An unknown (zero) total
/// renders as 0% rather than dividing by zero.
pub fn percent(elapsed_secs: f64, total_secs: f64) -> f64 {
    if total_secs <= 0.0 {
        return 0.0;
    }
    (elapsed_secs / total_secs * 100.0).clamp(0.0, 100.0)
}

/// Splits a raw diagnostic byte stream into lines, buffering partial lines
/// across reads. ffmpeg rewrites its stats line with bare carriage returns,
/// so splitting on `\n` alone would stall the display until the pass exits.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        LineBuffer::default()
    }

    /// Feeds one read's worth of bytes and returns the lines it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\r' || b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            if !text.is_empty() {
                lines.push(text.into_owned());
            }
        }
        lines
    }

    /// Returns whatever trailing text never saw a terminator.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(text)
    }
}

/// Drives one progress bar for one encode pass.
pub struct ProgressMonitor {
    elapsed_tx: watch::Sender<f64>,
    render: JoinHandle<()>,
}

impl ProgressMonitor {
    /// Spawns the render task for a pass expected to cover `total_secs` of
    /// media time.
    pub fn start(label: &str, total_secs: f64) -> Self {
        let (elapsed_tx, mut elapsed_rx) = watch::channel(0.0f64);
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .expect("progress template is valid")
                .progress_chars("=>-"),
        );
        bar.set_message(label.to_string());

        let render = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(RENDER_INTERVAL_MS));
            loop {
                tick.tick().await;
                let elapsed = *elapsed_rx.borrow_and_update();
                bar.set_position(percent(elapsed, total_secs).round() as u64);
                if elapsed_rx.has_changed().is_err() {
                    // Sender dropped: the pass is over.
                    break;
                }
            }
            bar.set_position(100);
            bar.finish();
        });

        ProgressMonitor { elapsed_tx, render }
    }

    /// Feeds one diagnostic line; lines without a time marker are ignored.
    pub fn observe_line(&self, line: &str) {
        if let Some(elapsed) = parse_time_marker(line) {
            let _ = self.elapsed_tx.send(elapsed);
        }
    }

    /// Stops the render task and waits for the final 100% frame.
    pub async fn finish(self) {
        drop(self.elapsed_tx);
        let _ = self.render.await;
    }
}

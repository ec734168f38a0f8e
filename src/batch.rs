use std::future::Future;
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::encoder::{EncodeJob, EncodeSummary, Encoder};
use crate::error::CompressError;
use crate::options::QualityPreset;

/// Extensions treated as video files when scanning a directory.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v"];

const DEFAULT_OUTPUT_SUBDIR: &str = "compressed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Succeeded,
    Failed(String),
    /// Output already existed; the encoder was never invoked.
    Skipped,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<(PathBuf, FileOutcome)>,
}

/// Sequentially compresses every video directly inside a directory. One bad
/// file is logged and counted, never a reason to stop the rest.
pub struct BatchRunner {
    target_size_mb: f64,
    preset: QualityPreset,
    extensions: Vec<String>,
}

impl BatchRunner {
    pub fn new(target_size_mb: f64, preset: QualityPreset) -> Self {
        Self::with_extensions(target_size_mb, preset, VIDEO_EXTENSIONS)
    }

    pub fn with_extensions(target_size_mb: f64, preset: QualityPreset, extensions: &[&str]) -> Self {
        BatchRunner {
            target_size_mb,
            preset,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Video files directly inside `input_dir`, in directory-listing order.
    /// No recursion; extension matching is case-insensitive.
    pub fn collect_candidates(&self, input_dir: &Path) -> Result<Vec<PathBuf>, CompressError> {
        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(input_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(extension) = path.extension().map(|e| e.to_string_lossy().to_lowercase())
            else {
                continue;
            };
            if self.extensions.iter().any(|allowed| *allowed == extension) {
                candidates.push(path);
            }
        }
        Ok(candidates)
    }

    /// Where the compressed version of `input` lands inside `output_dir`.
    pub fn output_path(&self, input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output_dir.join(format!("{}_compressed.mp4", stem))
    }

    /// Runs the batch with the real encoder.
    pub async fn run(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        encoder: &Encoder,
    ) -> Result<BatchResult, CompressError> {
        self.run_with(input_dir, output_dir, |job| async move {
            encoder.compress(&job).await
        })
        .await
    }

    /// Runs the batch with an injected per-file encode function, so tests can
    /// count invocations and simulate failures without ffmpeg.
    pub async fn run_with<F, Fut>(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        mut encode: F,
    ) -> Result<BatchResult, CompressError>
    where
        F: FnMut(EncodeJob) -> Fut,
        Fut: Future<Output = Result<EncodeSummary, CompressError>>,
    {
        if !input_dir.is_dir() {
            return Err(CompressError::InputNotFound(input_dir.to_path_buf()));
        }
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input_dir.join(DEFAULT_OUTPUT_SUBDIR),
        };
        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)?;
        }

        let candidates = self.collect_candidates(input_dir)?;
        info!(
            "Batch: {} candidate file(s) in {:?}, output to {:?}",
            candidates.len(),
            input_dir,
            output_dir
        );

        let mut result = BatchResult::default();
        for input in candidates {
            let output = self.output_path(&input, &output_dir);
            if output.exists() {
                info!("Skipping {:?}: output {:?} already exists", input, output);
                result.skipped += 1;
                result.outcomes.push((input, FileOutcome::Skipped));
                continue;
            }
            let job = EncodeJob {
                input: input.clone(),
                output,
                target_size_mb: self.target_size_mb,
                preset: self.preset,
            };
            match encode(job).await {
                Ok(summary) => {
                    info!(
                        "Compressed {:?}: {:.2} MB -> {:.2} MB",
                        input, summary.input_size_mb, summary.output_size_mb
                    );
                    result.succeeded += 1;
                    result.outcomes.push((input, FileOutcome::Succeeded));
                }
                Err(e) => {
                    error!("Failed to compress {:?}: {}", input, e);
                    result.failed += 1;
                    result.outcomes.push((input, FileOutcome::Failed(e.to_string())));
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodeAction;
    use std::ffi::OsStr;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    fn ok_summary() -> EncodeSummary {
        EncodeSummary {
            action: EncodeAction::Encoded,
            input_size_mb: 100.0,
            output_size_mb: 40.0,
            compression_ratio: 60.0,
            fits_upload_limit: true,
        }
    }

    #[test]
    fn only_allow_listed_extensions_are_candidates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "b.MOV"); // case-insensitive
        touch(dir.path(), "c.mkv");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "noext");
        std::fs::create_dir(dir.path().join("sub.mp4")).unwrap(); // directory, not a file

        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let candidates = runner.collect_candidates(dir.path()).unwrap();
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn output_name_keeps_the_compressed_suffix() {
        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let output = runner.output_path(Path::new("/in/holiday.mov"), Path::new("/out"));
        assert_eq!(output, Path::new("/out/holiday_compressed.mp4"));
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "good1.mp4");
        touch(dir.path(), "bad.mp4");
        touch(dir.path(), "good2.webm");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "data.json");

        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let mut invocations = 0;
        let result = runner
            .run_with(dir.path(), None, |job| {
                invocations += 1;
                let fail = job.input.file_name() == Some(OsStr::new("bad.mp4"));
                async move {
                    if fail {
                        Err(CompressError::Probe {
                            path: job.input.clone(),
                            reason: "simulated bad file".to_string(),
                        })
                    } else {
                        Ok(ok_summary())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(invocations, 3, "only the three videos are jobs");
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 0);
        assert!(result
            .outcomes
            .iter()
            .any(|(path, outcome)| path.ends_with("bad.mp4")
                && matches!(outcome, FileOutcome::Failed(_))));
    }

    #[tokio::test]
    async fn existing_output_is_skipped_without_invoking_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "one.mp4");
        touch(dir.path(), "two.mp4");
        let out_dir = dir.path().join("compressed");
        std::fs::create_dir(&out_dir).unwrap();
        touch(&out_dir, "one_compressed.mp4");

        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let mut encoded: Vec<PathBuf> = Vec::new();
        let result = runner
            .run_with(dir.path(), None, |job| {
                encoded.push(job.input.clone());
                async move { Ok(ok_summary()) }
            })
            .await
            .unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failed, 0);
        assert_eq!(encoded.len(), 1);
        assert!(encoded[0].ends_with("two.mp4"));
    }

    #[tokio::test]
    async fn default_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "clip.mp4");

        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        runner
            .run_with(dir.path(), None, |_job| async move { Ok(ok_summary()) })
            .await
            .unwrap();
        assert!(dir.path().join("compressed").is_dir());
    }

    #[tokio::test]
    async fn explicit_output_directory_is_used() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "clip.mp4");
        let out = dir.path().join("elsewhere");

        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let mut seen: Vec<PathBuf> = Vec::new();
        runner
            .run_with(dir.path(), Some(&out), |job| {
                seen.push(job.output.clone());
                async move { Ok(ok_summary()) }
            })
            .await
            .unwrap();
        assert_eq!(seen, vec![out.join("clip_compressed.mp4")]);
    }

    #[tokio::test]
    async fn missing_input_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BatchRunner::new(45.0, QualityPreset::Medium);
        let err = runner
            .run_with(&dir.path().join("absent"), None, |_job| async move {
                Ok(ok_summary())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CompressError::InputNotFound(_)));
    }
}

use std::path::Path;

use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::CompressError;

/// Container/stream metadata for one input file, read once via ffprobe.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub duration_secs: f64,
    /// Full ffprobe document, kept for diagnostics.
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct ProbeDocument {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl MediaInfo {
    /// Parses raw ffprobe JSON output. Split from the subprocess call so the
    /// parsing rules are testable against canned output.
    pub fn from_json(stdout: &[u8]) -> Result<MediaInfo, String> {
        let raw: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| format!("ffprobe output is not valid JSON: {}", e))?;
        let document: ProbeDocument = serde_json::from_value(raw.clone())
            .map_err(|e| format!("ffprobe output is missing the format block: {}", e))?;
        let duration_secs = document
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| "duration field is absent or not numeric".to_string())?;
        Ok(MediaInfo { duration_secs, raw })
    }
}

/// Runs ffprobe against `path` and returns its metadata. Probing is
/// deterministic, so there are no retries; any failure means the file is bad
/// or unsupported.
pub async fn probe(path: &Path) -> Result<MediaInfo, CompressError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(CompressError::Probe {
            path: path.to_path_buf(),
            reason: format!("ffprobe exited with {}", output.status),
        });
    }

    let info = MediaInfo::from_json(&output.stdout).map_err(|reason| CompressError::Probe {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!("Probed {:?}: duration {:.2}s", path, info.duration_secs);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_duration_from_format_block() {
        let json = br#"{
            "format": {"filename": "clip.mp4", "duration": "123.456", "bit_rate": "2000000"},
            "streams": [{"codec_type": "video", "codec_name": "h264"}]
        }"#;
        let info = MediaInfo::from_json(json).unwrap();
        assert!((info.duration_secs - 123.456).abs() < 1e-9);
        assert_eq!(info.raw["streams"][0]["codec_name"], "h264");
    }

    #[test]
    fn missing_duration_is_an_error() {
        let json = br#"{"format": {"filename": "clip.mp4"}, "streams": []}"#;
        let err = MediaInfo::from_json(json).unwrap_err();
        assert!(err.contains("duration"), "unexpected error: {}", err);
    }

    #[test]
    fn non_numeric_duration_is_an_error() {
        let json = br#"{"format": {"duration": "N/A"}, "streams": []}"#;
        assert!(MediaInfo::from_json(json).is_err());
    }

    #[test]
    fn garbage_output_is_an_error() {
        assert!(MediaInfo::from_json(b"not json at all").is_err());
        assert!(MediaInfo::from_json(b"{}").is_err());
    }
}

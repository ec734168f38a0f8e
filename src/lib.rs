pub mod batch;
pub mod bitrate;
pub mod config;
pub mod encoder;
pub mod error;
pub mod options;
pub mod probe;
pub mod progress;

use std::path::Path;

/// File size in megabytes (1 MB = 1024 * 1024 bytes, matching how upload
/// limits are quoted).
pub async fn file_size_mb(path: &Path) -> Result<f64, std::io::Error> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}

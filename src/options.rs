use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Fast,
    #[default]
    Medium,
    Slow,
    High,
}

impl QualityPreset {
    /// The `-preset` value handed to ffmpeg for this quality level.
    pub fn speed(self) -> &'static str {
        match self {
            QualityPreset::Fast => "fast",
            QualityPreset::Medium => "medium",
            QualityPreset::Slow => "slow",
            QualityPreset::High => "veryslow",
        }
    }

    /// Reference CRF for this quality level. Two-pass runs are bitrate-driven,
    /// so this never enters the command line; it is reported alongside the
    /// speed preset so users can compare levels.
    pub fn crf(self) -> u8 {
        match self {
            QualityPreset::Fast => 28,
            QualityPreset::Medium => 23,
            QualityPreset::Slow => 20,
            QualityPreset::High => 18,
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityPreset::Fast => "fast",
            QualityPreset::Medium => "medium",
            QualityPreset::Slow => "slow",
            QualityPreset::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// Knobs the encoder needs beyond the per-job target size and preset. Carried
/// explicitly instead of living as module constants so tests can substitute
/// them.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Audio bitrate reserved out of the size budget and used for pass 2.
    pub audio_bitrate_bps: u64,
    /// Floor for the computed video bitrate. Takes precedence over hitting
    /// the exact target size.
    pub min_video_bitrate_bps: u64,
    /// Advisory upload ceiling reported after an encode.
    pub upload_limit_mb: f64,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        EncoderSettings {
            audio_bitrate_bps: 128_000,
            min_video_bitrate_bps: 500_000,
            upload_limit_mb: 50.0,
        }
    }
}

impl EncoderSettings {
    /// Audio bitrate in the `128k` form ffmpeg takes on the command line.
    pub fn audio_bitrate_arg(&self) -> String {
        format!("{}k", self.audio_bitrate_bps / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_presets_map_to_x264_speeds() {
        assert_eq!(QualityPreset::Fast.speed(), "fast");
        assert_eq!(QualityPreset::Medium.speed(), "medium");
        assert_eq!(QualityPreset::Slow.speed(), "slow");
        assert_eq!(QualityPreset::High.speed(), "veryslow");
    }

    #[test]
    fn higher_quality_means_lower_crf() {
        assert!(QualityPreset::Fast.crf() > QualityPreset::Medium.crf());
        assert!(QualityPreset::Medium.crf() > QualityPreset::Slow.crf());
        assert!(QualityPreset::Slow.crf() > QualityPreset::High.crf());
    }

    #[test]
    fn preset_round_trips_through_config_names() {
        let parsed: QualityPreset = serde_json::from_str("\"slow\"").unwrap();
        assert_eq!(parsed, QualityPreset::Slow);
        assert_eq!(parsed.to_string(), "slow");
    }

    #[test]
    fn default_settings_match_documented_values() {
        let settings = EncoderSettings::default();
        assert_eq!(settings.audio_bitrate_bps, 128_000);
        assert_eq!(settings.min_video_bitrate_bps, 500_000);
        assert_eq!(settings.upload_limit_mb, 50.0);
        assert_eq!(settings.audio_bitrate_arg(), "128k");
    }
}

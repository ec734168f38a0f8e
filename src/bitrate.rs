//! Bitrate planning for size-targeted encodes.

/// Video bitrate (bps) that makes `duration_secs` of output land close to
/// `target_size_mb`, after reserving `audio_bitrate_bps` for the audio track.
///
/// The result never drops below `floor_bps`: a watchable floor beats hitting
/// the exact target size. Callers must reject non-positive durations before
/// getting here; an unknown duration is a probe failure, not something to
/// divide by.
pub fn video_bitrate(
    target_size_mb: f64,
    duration_secs: f64,
    audio_bitrate_bps: u64,
    floor_bps: u64,
) -> u64 {
    let total_bits = target_size_mb * 8.0 * 1024.0 * 1024.0;
    let overall_bps = (total_bits / duration_secs) as i64;
    let video_bps = overall_bps - audio_bitrate_bps as i64;
    video_bps.max(floor_bps as i64) as u64
}

/// Parses the human bitrate strings the config file uses ("128k", "2M", or
/// bare bits-per-second digits).
pub fn parse_bitrate(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Some(digits) = value.strip_suffix(['k', 'K']) {
        digits.parse::<u64>().ok().map(|n| n * 1_000)
    } else if let Some(digits) = value.strip_suffix(['m', 'M']) {
        digits.parse::<u64>().ok().map(|n| n * 1_000_000)
    } else {
        value.parse().ok()
    }
}

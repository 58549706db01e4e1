//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

/// Feed one `key=value` line into `current`.
///
/// Returns a snapshot when a block ends (`progress=continue|end`), and
/// `None` for other keys. Lines that are not progress keys return `None`
/// and leave `current` untouched.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value
                .trim()
                .strip_suffix('x')
                .and_then(|s| s.trim().parse().ok())
            {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }
    None
}

/// Check whether a stderr line belongs to the `-progress` stream.
pub fn is_progress_line(line: &str) -> bool {
    const KEYS: [&str; 12] = [
        "frame",
        "fps",
        "stream_0_0_q",
        "bitrate",
        "total_size",
        "out_time_us",
        "out_time_ms",
        "out_time",
        "dup_frames",
        "drop_frames",
        "speed",
        "progress",
    ];
    match line.trim().split_once('=') {
        Some((key, _)) => KEYS.contains(&key) || key.starts_with("stream_"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=continue", &mut progress).unwrap();
        assert!(!snapshot.is_complete);

        let result = parse_progress_line("progress=end", &mut progress);
        assert!(result.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_is_progress_line() {
        assert!(is_progress_line("frame=120"));
        assert!(is_progress_line("stream_1_0_q=28.0"));
        assert!(!is_progress_line("[libx264 @ 0x55] error while encoding"));
        assert!(!is_progress_line("clip.mov: Invalid data found when processing input"));
    }
}

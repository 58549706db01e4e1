//! Single-pass derivation of the web video, preview and thumbnail.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cobot_models::{ArtifactKind, MediaSet};
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner, OutputSpec};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{ensure_dir, remove_if_exists};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Output geometry and codecs of one transcode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProfile {
    /// Bounding box of the web rendition
    pub web_width: u32,
    pub web_height: u32,
    /// Preview resolution and frame rate
    pub preview_width: u32,
    pub preview_height: u32,
    pub preview_fps: u32,
    /// Thumbnail resolution and offset into the source
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_offset_secs: f64,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            web_width: 1280,
            web_height: 720,
            preview_width: 480,
            preview_height: 270,
            preview_fps: 10,
            thumbnail_width: 640,
            thumbnail_height: 360,
            thumbnail_offset_secs: 1.0,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
        }
    }
}

/// Result of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodeSummary {
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Build the one FFmpeg invocation that writes all three renditions.
pub fn build_transcode_command(set: &MediaSet, profile: &TranscodeProfile) -> FfmpegCommand {
    let web = OutputSpec::new(set.artifact_path(ArtifactKind::WebVideo))
        .video_filter(format!(
            "scale={}:{}:force_original_aspect_ratio=decrease:force_divisible_by=2",
            profile.web_width, profile.web_height
        ))
        .video_codec(&profile.video_codec)
        .audio_codec(&profile.audio_codec)
        .faststart();

    let preview = OutputSpec::new(set.artifact_path(ArtifactKind::Preview))
        .frame_rate(profile.preview_fps)
        .video_filter(format!(
            "scale={}:{}",
            profile.preview_width, profile.preview_height
        ))
        .no_audio()
        .video_codec(&profile.video_codec)
        .faststart()
        .format("mp4");

    let thumbnail = OutputSpec::new(set.artifact_path(ArtifactKind::Thumbnail))
        .seek(profile.thumbnail_offset_secs)
        .single_frame()
        .video_filter(format!(
            "scale={}:{}",
            profile.thumbnail_width, profile.thumbnail_height
        ));

    FfmpegCommand::new(set.source_path())
        .output(web)
        .output(preview)
        .output(thumbnail)
}

/// Transcode a staged upload into its artifact directory.
///
/// The three outputs come from one process; if it fails none of them is
/// valid. Partial files are left for the caller to sweep.
pub async fn transcode(
    set: &MediaSet,
    profile: &TranscodeProfile,
    runner: &FfmpegRunner,
) -> MediaResult<TranscodeSummary> {
    let source = set.source_path();
    if !source.exists() {
        return Err(MediaError::FileNotFound(source));
    }

    // Resolve the tool before touching the destination tree
    let tool_path = runner.tool().locate()?;
    info!(tool = %runner.tool().name(), path = %tool_path.display(), "Transcoding {}", set);

    ensure_dir(set.dest_subdir()).await?;

    let cmd = build_transcode_command(set, profile);
    let start = Instant::now();
    runner
        .run_with_progress(&cmd, |progress| {
            debug!(
                frame = progress.frame,
                out_time_ms = progress.out_time_ms,
                speed = progress.speed,
                "Transcode progress"
            );
        })
        .await?;
    let elapsed = start.elapsed();

    let outputs = cmd.output_paths();
    let missing: Vec<_> = outputs.iter().filter(|p| !p.exists()).collect();
    if !missing.is_empty() {
        return Err(MediaError::tool_failed(
            runner.tool().name(),
            format!(
                "exited successfully but did not write {}",
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None,
            Some(0),
        ));
    }

    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        "Transcoded {} into {} outputs",
        set.dest_name,
        outputs.len()
    );

    Ok(TranscodeSummary { outputs, elapsed })
}

/// Remove whatever a failed transcode left behind under the stem.
///
/// Best effort: removal failures are logged. Returns the removed paths.
pub async fn sweep_partial_outputs(set: &MediaSet) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for kind in ArtifactKind::TRANSCODED {
        let path = set.artifact_path(kind);
        match remove_if_exists(&path).await {
            Ok(true) => removed.push(path),
            Ok(false) => {}
            Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ExternalTool;
    use chrono::TimeZone;
    use cobot_models::Identifier;
    use tempfile::TempDir;

    fn sample_set(root: &std::path::Path) -> MediaSet {
        MediaSet::new(
            root.join("upload").join("cobot-1.mov"),
            root.join("record"),
            chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            &Identifier::parse("a1b2c3d4e5f60718293a4b5c6d7e8f90").unwrap(),
            "",
        )
        .unwrap()
    }

    fn position(args: &[String], needle: &str) -> usize {
        args.iter().position(|a| a == needle).unwrap()
    }

    #[test]
    fn test_command_layout() {
        let set = sample_set(std::path::Path::new("/srv"));
        let args = build_transcode_command(&set, &TranscodeProfile::default()).build_args();

        let mp4 = position(&args, &set.artifact_path(ArtifactKind::WebVideo).to_string_lossy());
        let mpv = position(&args, &set.artifact_path(ArtifactKind::Preview).to_string_lossy());
        let jpg = position(&args, &set.artifact_path(ArtifactKind::Thumbnail).to_string_lossy());
        assert!(mp4 < mpv && mpv < jpg);

        // Web rendition keeps audio and is bounded to 1280x720
        let web_args = &args[..mp4];
        assert!(web_args.iter().any(|a| a.starts_with("scale=1280:720")));
        assert!(web_args.contains(&"aac".to_string()));

        // Preview drops audio, runs at 10 fps, 480x270, mp4 container
        let preview_args = &args[mp4 + 1..mpv];
        assert!(preview_args.contains(&"-an".to_string()));
        assert!(preview_args.contains(&"10".to_string()));
        assert!(preview_args.contains(&"scale=480:270".to_string()));
        assert!(preview_args.contains(&"+faststart".to_string()));
        assert_eq!(preview_args[preview_args.len() - 1], "mp4");

        // Thumbnail is one frame at 1s, 640x360
        let thumb_args = &args[mpv + 1..jpg];
        assert!(thumb_args.contains(&"1.000".to_string()));
        assert!(thumb_args.contains(&"-frames:v".to_string()));
        assert!(thumb_args.contains(&"scale=640:360".to_string()));
    }

    #[tokio::test]
    async fn test_missing_tool_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let set = sample_set(dir.path());
        std::fs::create_dir_all(&set.source_dir).unwrap();
        std::fs::write(set.source_path(), b"data").unwrap();

        let runner = FfmpegRunner::new(ExternalTool::new("ffmpeg", "cobot-missing-ffmpeg"));
        let err = transcode(&set, &TranscodeProfile::default(), &runner)
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(!set.dest_subdir().exists());
    }

    #[tokio::test]
    async fn test_sweep_partial_outputs() {
        let dir = TempDir::new().unwrap();
        let set = sample_set(dir.path());
        std::fs::create_dir_all(set.dest_subdir()).unwrap();
        std::fs::write(set.artifact_path(ArtifactKind::WebVideo), b"partial").unwrap();
        std::fs::write(set.artifact_path(ArtifactKind::Subtitles), b"WEBVTT").unwrap();

        let removed = sweep_partial_outputs(&set).await;

        assert_eq!(removed, vec![set.artifact_path(ArtifactKind::WebVideo)]);
        // Only transcode outputs are swept
        assert!(set.artifact_path(ArtifactKind::Subtitles).exists());
    }
}

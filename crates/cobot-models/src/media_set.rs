//! Media descriptor and the artifact naming scheme.
//!
//! All destination paths of one upload are derived from a single upload
//! timestamp and a single [`Identifier`], so the artifact set can always be
//! rediscovered from its stem.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Identifier;

/// Tag prefixed to every destination stem.
pub const PRODUCT_TAG: &str = "COBOT";

/// Prefix of staged upload files.
pub const STAGING_PREFIX: &str = "cobot-";

/// Timestamp layout used for the per-upload subdirectory and the stem.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Encoding profile label recorded on each descriptor.
pub const DEFAULT_DESCRIPTION: &str =
    "mp4 1280x720 h264/aac faststart; mpv 480x270 10fps no-audio; jpg 640x360 @1s; vtt placeholder";

/// Errors building a media descriptor.
#[derive(Debug, Error)]
pub enum MediaSetError {
    #[error("staged path has no file name: {0}")]
    MissingFileName(PathBuf),
}

/// One derived artifact of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Web-playable rendition
    WebVideo,
    /// Low-bitrate preview rendition
    Preview,
    /// Still-frame thumbnail
    Thumbnail,
    /// Subtitle track
    Subtitles,
}

impl ArtifactKind {
    /// Every artifact of a complete set.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::WebVideo,
        ArtifactKind::Preview,
        ArtifactKind::Thumbnail,
        ArtifactKind::Subtitles,
    ];

    /// Artifacts written by the single transcode invocation.
    pub const TRANSCODED: [ArtifactKind; 3] = [
        ArtifactKind::WebVideo,
        ArtifactKind::Preview,
        ArtifactKind::Thumbnail,
    ];

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::WebVideo => "mp4",
            ArtifactKind::Preview => "mpv",
            ArtifactKind::Thumbnail => "jpg",
            ArtifactKind::Subtitles => "vtt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::WebVideo => "web_video",
            ArtifactKind::Preview => "preview",
            ArtifactKind::Thumbnail => "thumbnail",
            ArtifactKind::Subtitles => "subtitles",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Format an upload timestamp at second resolution.
pub fn timestamp_label(uploaded_at: DateTime<Utc>) -> String {
    uploaded_at.format(TIMESTAMP_FORMAT).to_string()
}

/// Destination stem shared by every artifact of one upload.
pub fn destination_stem(uploaded_at: DateTime<Utc>, identifier: &Identifier) -> String {
    format!(
        "{}-{}-U{}",
        PRODUCT_TAG,
        timestamp_label(uploaded_at),
        identifier
    )
}

/// Extension (with leading dot) preserved from a client-supplied filename.
///
/// Only the final path component is considered and the extension must be
/// ASCII alphanumeric; anything else yields an empty string.
pub fn staging_extension(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 16
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}

/// One upload's processing unit.
///
/// Created once the raw upload is durably staged and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSet {
    /// Directory holding the staged upload
    pub source_dir: PathBuf,
    /// File name of the staged upload
    pub source_name: String,
    /// Destination root
    pub dest_dir: PathBuf,
    /// Per-upload subdirectory under the destination root
    pub dest_base: String,
    /// Stem shared by all artifacts
    pub dest_name: String,
    /// Encoding profile label
    pub description: String,
}

impl MediaSet {
    /// Build the descriptor for a staged file.
    pub fn new(
        staged_path: impl AsRef<Path>,
        dest_dir: impl AsRef<Path>,
        uploaded_at: DateTime<Utc>,
        identifier: &Identifier,
        description: impl Into<String>,
    ) -> Result<Self, MediaSetError> {
        let staged_path = staged_path.as_ref();
        let source_name = staged_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MediaSetError::MissingFileName(staged_path.to_path_buf()))?;
        let source_dir = staged_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            source_dir,
            source_name,
            dest_dir: dest_dir.as_ref().to_path_buf(),
            dest_base: timestamp_label(uploaded_at),
            dest_name: destination_stem(uploaded_at, identifier),
            description: description.into(),
        })
    }

    /// Path of the staged upload.
    pub fn source_path(&self) -> PathBuf {
        self.source_dir.join(&self.source_name)
    }

    /// Directory receiving every artifact.
    pub fn dest_subdir(&self) -> PathBuf {
        self.dest_dir.join(&self.dest_base)
    }

    /// Path of a single artifact.
    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.dest_subdir()
            .join(format!("{}.{}", self.dest_name, kind.extension()))
    }

    /// Paths of the complete artifact set.
    pub fn artifact_paths(&self) -> Vec<(ArtifactKind, PathBuf)> {
        ArtifactKind::ALL
            .iter()
            .map(|kind| (*kind, self.artifact_path(*kind)))
            .collect()
    }

    /// Artifact path relative to the destination root, as served over HTTP.
    pub fn artifact_relative_path(&self, kind: ArtifactKind) -> String {
        format!("{}/{}.{}", self.dest_base, self.dest_name, kind.extension())
    }
}

impl fmt::Display for MediaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MediaSet source: {}, dest: {}/{}",
            self.source_path().display(),
            self.dest_subdir().display(),
            self.dest_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_id() -> Identifier {
        Identifier::parse("a1b2c3d4e5f60718293a4b5c6d7e8f90").unwrap()
    }

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_naming_scenario() {
        let set = MediaSet::new(
            "upload/cobot-123456.mov",
            "asset/record",
            sample_time(),
            &sample_id(),
            DEFAULT_DESCRIPTION,
        )
        .unwrap();

        assert_eq!(set.source_path(), PathBuf::from("upload/cobot-123456.mov"));
        assert_eq!(set.dest_base, "20240102T030405");
        assert_eq!(
            set.dest_name,
            "COBOT-20240102T030405-Ua1b2c3d4e5f60718293a4b5c6d7e8f90"
        );
        assert_eq!(
            set.artifact_path(ArtifactKind::WebVideo),
            PathBuf::from(
                "asset/record/20240102T030405/COBOT-20240102T030405-Ua1b2c3d4e5f60718293a4b5c6d7e8f90.mp4"
            )
        );
    }

    #[test]
    fn test_artifacts_share_stem() {
        let set = MediaSet::new("upload/x.mov", "record", sample_time(), &sample_id(), "")
            .unwrap();
        let paths = set.artifact_paths();
        assert_eq!(paths.len(), 4);

        let mut extensions = Vec::new();
        for (_, path) in &paths {
            assert_eq!(path.parent().unwrap(), set.dest_subdir());
            assert_eq!(path.file_stem().unwrap().to_str().unwrap(), set.dest_name);
            extensions.push(path.extension().unwrap().to_str().unwrap().to_string());
        }
        assert_eq!(extensions, vec!["mp4", "mpv", "jpg", "vtt"]);
    }

    #[test]
    fn test_naming_is_pure() {
        let a = MediaSet::new("upload/a.mov", "record", sample_time(), &sample_id(), "").unwrap();
        let b = MediaSet::new("upload/a.mov", "record", sample_time(), &sample_id(), "").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_second_distinct_stems() {
        let a = destination_stem(sample_time(), &Identifier::generate().unwrap());
        let b = destination_stem(sample_time(), &Identifier::generate().unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn test_staging_extension() {
        assert_eq!(staging_extension("clip.mov"), ".mov");
        assert_eq!(staging_extension("archive.tar.gz"), ".gz");
        assert_eq!(staging_extension("noext"), "");
        assert_eq!(staging_extension(".hidden"), "");
        assert_eq!(staging_extension("trailing."), "");
        assert_eq!(staging_extension("../../etc/passwd"), "");
        assert_eq!(staging_extension("dir.d/clip"), "");
        assert_eq!(staging_extension("C:\\videos\\clip.MP4"), ".MP4");
        assert_eq!(staging_extension("evil.m ov"), "");
    }

    #[test]
    fn test_missing_file_name() {
        let err = MediaSet::new("/", "record", sample_time(), &sample_id(), "").unwrap_err();
        assert!(matches!(err, MediaSetError::MissingFileName(_)));
    }

    #[test]
    fn test_relative_path() {
        let set = MediaSet::new("upload/a", "record", sample_time(), &sample_id(), "").unwrap();
        assert_eq!(
            set.artifact_relative_path(ArtifactKind::Subtitles),
            format!("20240102T030405/{}.vtt", set.dest_name)
        );
    }
}

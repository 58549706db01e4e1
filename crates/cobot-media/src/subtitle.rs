//! Placeholder WebVTT subtitle track.

use std::path::Path;

use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Placeholder used until real subtitles are generated.
pub const PLACEHOLDER_VTT: &str = "WEBVTT

NOTE
Placeholder track for {stem}. Captions have not been generated yet.

00:00:00.000 --> 00:00:05.000
Subtitles are not available yet.
";

/// Subtitle document template; `{stem}` is replaced with the destination stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTemplate {
    body: String,
}

impl Default for SubtitleTemplate {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl SubtitleTemplate {
    /// The embedded placeholder template.
    pub fn placeholder() -> Self {
        Self {
            body: PLACEHOLDER_VTT.to_string(),
        }
    }

    /// Validate and wrap a template body.
    pub fn from_string(body: impl Into<String>) -> MediaResult<Self> {
        let body = body.into();
        let header = body.trim_start_matches('\u{feff}');
        if !header.starts_with("WEBVTT") {
            return Err(MediaError::InvalidTemplate(
                "template must start with a WEBVTT header".to_string(),
            ));
        }
        if !body.contains("-->") {
            return Err(MediaError::InvalidTemplate(
                "template must contain at least one timed cue".to_string(),
            ));
        }
        Ok(Self { body })
    }

    /// Load a template from disk.
    pub async fn from_file(path: impl AsRef<Path>) -> MediaResult<Self> {
        let body = fs::read_to_string(path.as_ref()).await?;
        Self::from_string(body)
    }

    /// Render the document for one artifact set.
    pub fn render(&self, stem: &str) -> String {
        self.body.replace("{stem}", stem)
    }
}

/// Write the subtitle document for `stem` to `target`.
pub async fn write_subtitles(
    target: impl AsRef<Path>,
    template: &SubtitleTemplate,
    stem: &str,
) -> MediaResult<()> {
    fs::write(target.as_ref(), template.render(stem)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_placeholder_is_valid_webvtt() {
        let rendered = SubtitleTemplate::placeholder().render("COBOT-20240102T030405-Uabc");
        assert!(rendered.starts_with("WEBVTT\n\n"));
        assert!(rendered.contains("NOTE\n"));
        assert!(rendered.contains("00:00:00.000 --> 00:00:05.000"));
        assert!(rendered.contains("COBOT-20240102T030405-Uabc"));
        assert!(!rendered.contains("{stem}"));
    }

    #[test]
    fn test_template_validation() {
        assert!(SubtitleTemplate::from_string("hello").is_err());
        assert!(SubtitleTemplate::from_string("WEBVTT\n\n").is_err());
        let with_bom = "\u{feff}WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhi\n";
        assert!(SubtitleTemplate::from_string(with_bom).is_ok());
    }

    #[tokio::test]
    async fn test_write_subtitles() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("COBOT-x.vtt");

        write_subtitles(&target, &SubtitleTemplate::default(), "COBOT-x")
            .await
            .unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        assert!(written.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("COBOT-x.vtt");

        let err = write_subtitles(&target, &SubtitleTemplate::default(), "COBOT-x")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("template.vtt");
        std::fs::write(&path, "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n{stem}\n").unwrap();

        let template = SubtitleTemplate::from_file(&path).await.unwrap();
        assert_eq!(template.render("S"), "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nS\n");
    }
}

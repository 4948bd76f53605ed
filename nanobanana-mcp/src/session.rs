//! Per-process session state: the most recently saved image.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use nanobanana_mcp_common::error::Error;
use serde::Serialize;

/// Tracks the last image path for edit chaining.
#[derive(Debug, Default)]
pub struct SessionState {
    last_image: Option<PathBuf>,
}

/// Result of querying the last image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LastImageInfo {
    /// No image saved yet in this session
    None,
    /// The file is still on disk
    #[serde(rename_all = "camelCase")]
    Exists {
        path: String,
        size_bytes: u64,
        modified_at: String,
    },
    /// The file was deleted externally
    Missing { path: String, exists: bool },
}

impl LastImageInfo {
    /// Tool output: `none` or a JSON object.
    pub fn render(&self) -> Result<String, Error> {
        match self {
            LastImageInfo::None => Ok("none".to_string()),
            other => Ok(serde_json::to_string(other)?),
        }
    }
}

impl SessionState {
    /// Empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently saved image, if any.
    pub fn last_image(&self) -> Option<&Path> {
        self.last_image.as_deref()
    }

    /// Remember `path` as the last image.
    pub fn record(&mut self, path: PathBuf) {
        self.last_image = Some(path);
    }

    /// The last image path, verified to still exist.
    ///
    /// # Errors
    /// `Error::PreconditionFailed` with distinct messages when no image has
    /// been saved yet or when the saved file has since disappeared.
    pub async fn require_last_image(&self) -> Result<PathBuf, Error> {
        let path = self.last_image.as_ref().ok_or_else(|| {
            Error::precondition("No previous image to continue editing. Generate or edit an image first.")
        })?;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(Error::precondition(format!(
                "Last image file is missing: {}",
                path.display()
            )));
        }

        Ok(path.clone())
    }

    /// Describe the last image.
    pub async fn info(&self) -> LastImageInfo {
        let Some(path) = &self.last_image else {
            return LastImageInfo::None;
        };
        let display = path.display().to_string();

        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                let modified_at = meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                    .unwrap_or_default();
                LastImageInfo::Exists {
                    path: display,
                    size_bytes: meta.len(),
                    modified_at,
                }
            }
            Err(_) => LastImageInfo::Missing {
                path: display,
                exists: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanobanana_mcp_common::ErrorKind;

    #[tokio::test]
    async fn test_info_none_before_any_save() {
        let session = SessionState::new();
        assert_eq!(session.info().await, LastImageInfo::None);
        assert_eq!(session.info().await.render().unwrap(), "none");
    }

    #[tokio::test]
    async fn test_info_reports_size_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated-x.png");
        std::fs::write(&path, b"12345").unwrap();

        let mut session = SessionState::new();
        session.record(path.clone());

        let rendered: serde_json::Value =
            serde_json::from_str(&session.info().await.render().unwrap()).unwrap();
        assert_eq!(rendered["path"], path.display().to_string());
        assert_eq!(rendered["sizeBytes"], 5);
        let modified = rendered["modifiedAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(modified).is_ok(), "{}", modified);
        assert!(modified.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_info_after_external_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.png");
        std::fs::write(&path, b"x").unwrap();

        let mut session = SessionState::new();
        session.record(path.clone());
        std::fs::remove_file(&path).unwrap();

        let rendered: serde_json::Value =
            serde_json::from_str(&session.info().await.render().unwrap()).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({"path": path.display().to_string(), "exists": false})
        );
    }

    #[tokio::test]
    async fn test_require_last_image_distinguishes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionState::new();

        let none = session.require_last_image().await.unwrap_err();
        assert_eq!(none.kind(), ErrorKind::PreconditionFailed);

        let path = dir.path().join("missing.png");
        session.record(path.clone());
        let missing = session.require_last_image().await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::PreconditionFailed);
        assert_ne!(none.to_string(), missing.to_string());
        assert!(missing.to_string().contains("missing.png"));

        std::fs::write(&path, b"x").unwrap();
        assert_eq!(session.require_last_image().await.unwrap(), path);
    }

    #[test]
    fn test_record_overwrites() {
        let mut session = SessionState::new();
        session.record(PathBuf::from("/a.png"));
        session.record(PathBuf::from("/b.png"));
        assert_eq!(session.last_image(), Some(Path::new("/b.png")));
    }
}

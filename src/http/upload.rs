//! Staging of multipart uploads.
//!
//! An uploaded image is streamed to a temporary file before it is forwarded.
//! The file belongs to a [`StagedUpload`] guard and is removed when the guard
//! is dropped, whichever way the handler exits. Removal failures are logged
//! and never surface to the caller.

use axum::extract::multipart::{Field, MultipartError};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::upstream::ImagePart;

const DEFAULT_FILE_NAME: &str = "upload";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read multipart field: {0}")]
    Multipart(#[from] MultipartError),
}

/// A file staged on disk for the duration of one request.
#[derive(Debug)]
pub struct StagedUpload {
    path: Option<TempPath>,
    field_name: String,
    file_name: String,
    content_type: String,
    len: u64,
}

impl StagedUpload {
    /// Stream `field` into a new temporary file under `dir`.
    ///
    /// On error the partially written file is removed before returning.
    pub async fn stage(dir: &Path, mut field: Field<'_>) -> Result<Self, UploadError> {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .file_name()
            .map(base_name)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let (file, path) = tempfile::Builder::new()
            .prefix("soil-upload-")
            .tempfile_in(dir)?
            .into_parts();

        let mut upload = Self {
            path: Some(path),
            field_name,
            file_name,
            content_type,
            len: 0,
        };

        let mut file = tokio::fs::File::from_std(file);
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            upload.len += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            path = %upload.path().display(),
            file_name = %upload.file_name,
            content_type = %upload.content_type,
            bytes = upload.len,
            "Upload staged"
        );

        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Describe the staged file for the upstream client.
    pub fn to_part(&self) -> ImagePart {
        ImagePart {
            field_name: self.field_name.clone(),
            path: PathBuf::from(self.path()),
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            len: self.len,
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => tracing::debug!(path = %shown, "Staged upload removed"),
                Err(e) => tracing::error!(path = %shown, error = %e, "Error deleting staged upload"),
            }
        }
    }
}

/// Create the staging directory if it does not exist yet.
pub async fn prepare_staging_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tracing::debug!(dir = %dir.display(), "Upload staging directory ready");
    Ok(())
}

/// Strip any directory part a client put in the file name.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

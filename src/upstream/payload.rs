//! Outbound request bodies.

use serde_json::{Map, Value};
use std::path::PathBuf;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

/// Body of a forwarded request.
#[derive(Debug, Clone)]
pub enum ProxyPayload {
    /// No body; sent as GET.
    Empty,
    /// JSON object forwarded field for field.
    Json(Map<String, Value>),
    /// One image streamed from a staged file as multipart form data.
    Image(ImagePart),
}

/// A staged image and the metadata the caller declared for it.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub field_name: String,
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    pub len: u64,
}

impl ImagePart {
    /// Build a fresh multipart form reading the staged file. A form is
    /// consumed by sending, so every attempt builds its own.
    pub async fn to_form(&self) -> std::io::Result<Form> {
        let part = match self.part().await?.mime_str(&self.content_type) {
            Ok(part) => part,
            Err(e) => {
                tracing::debug!(content_type = %self.content_type, error = %e, "Unparsable MIME type, sending without");
                self.part().await?
            }
        };

        Ok(Form::new().part(self.field_name.clone(), part))
    }

    async fn part(&self) -> std::io::Result<Part> {
        let file = tokio::fs::File::open(&self.path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        Ok(Part::stream_with_length(body, self.len).file_name(self.file_name.clone()))
    }
}

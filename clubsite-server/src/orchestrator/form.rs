//! Multipart form reading
//!
//! A part with a filename is a file; anything else is a text field. Browsers
//! send an empty, nameless file part when no file was chosen, so empty file
//! parts are dropped here and never reach the uploader.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::storage::UploadedFile;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Upload exceeds the configured size limit")]
    TooLarge,

    #[error("Malformed multipart body: {0}")]
    Malformed(String),
}

impl From<MultipartError> for FormError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FormError::TooLarge
        } else {
            FormError::Malformed(err.body_text())
        }
    }
}

/// Parsed form: text fields and non-empty file parts, by field name
#[derive(Debug, Clone, Default)]
pub struct FormData {
    text: BTreeMap<String, String>,
    files: BTreeMap<String, UploadedFile>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a multipart stream; a repeated field name keeps the last value
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut form = FormData::new();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        debug!(field = %name, "Skipping empty file part");
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile::new(file_name, content_type.as_deref(), bytes),
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.text.insert(name, value);
                }
            }
        }

        debug!(
            text_fields = form.text.len(),
            files = form.files.len(),
            "Parsed multipart form"
        );
        Ok(form)
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.text.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a file part; empty files are dropped as they are when parsing
    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        if !file.bytes.is_empty() {
            self.files.insert(name.to_string(), file);
        }
        self
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.text.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

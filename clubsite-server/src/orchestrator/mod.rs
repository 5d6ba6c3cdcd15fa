//! Upload-and-persist pipeline for admin submissions
//!
//! Steps, strictly in order:
//! 1. Validate the parsed form against the resource schema (no I/O)
//! 2. For caller-supplied ids, read the stored document when a create-only
//!    rule needs it: files required on creation and derived defaults
//! 3. Upload every declared file field that is present
//! 4. Write the document with the new public URLs
//! 5. On failure after an upload, delete each uploaded object once
//!
//! Authorization and multipart parsing happen in the HTTP layer before the
//! pipeline is entered.

pub mod form;
pub mod resources;
pub mod schema;

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{DocumentWriter, WriteError};
use crate::storage::{StoredObject, UploadError, Uploader};
use form::FormData;
use schema::{FieldError, ResourceSchema, Validation};

/// Successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub id: String,
    /// Public URLs keyed by target document field
    pub urls: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub struct Orchestrator {
    uploader: Uploader,
    writer: DocumentWriter,
}

impl Orchestrator {
    pub fn new(uploader: Uploader, writer: DocumentWriter) -> Self {
        Self { uploader, writer }
    }

    pub async fn submit(
        &self,
        schema: &ResourceSchema,
        form: &FormData,
    ) -> Result<SubmitOutcome, SubmitError> {
        let record = match schema.validate(form) {
            Validation::Valid(record) => record,
            Validation::Invalid(errors) => {
                warn!(resource = %schema.name, errors = errors.len(), "Submission rejected by validation");
                return Err(SubmitError::Validation(errors));
            }
        };

        let mut data = record.data;
        let missing_files = schema.missing_files(form);

        // Only a caller-supplied id can name a document that already exists
        let existing = match record.id.as_deref() {
            Some(id) if !missing_files.is_empty() || !record.defaults.is_empty() => {
                self.writer.current(schema.collection, id).await?
            }
            _ => None,
        };

        if existing.is_none() && !missing_files.is_empty() {
            warn!(resource = %schema.name, "New document is missing required files");
            return Err(SubmitError::Validation(missing_files));
        }

        for (field, value) in record.defaults {
            let stored = existing
                .as_ref()
                .and_then(|doc| doc.get(&field))
                .map_or(false, |v| !(v.is_null() || v.as_str() == Some("")));
            if !stored {
                data.insert(field, value);
            }
        }

        let mut uploaded: Vec<StoredObject> = Vec::new();
        let mut urls = BTreeMap::new();

        for spec in &schema.files {
            let Some(file) = form.file(spec.field) else {
                debug!(resource = %schema.name, field = %spec.field, "No file sent, keeping stored URL");
                continue;
            };

            match self.uploader.upload(file, schema.key_prefix).await {
                Ok(stored) => {
                    data.insert(spec.target.to_string(), Value::String(stored.url.clone()));
                    urls.insert(spec.target.to_string(), stored.url.clone());
                    uploaded.push(stored);
                }
                Err(e) => {
                    warn!(resource = %schema.name, field = %spec.field, error = %e, "Upload failed");
                    self.compensate(&uploaded).await;
                    return Err(e.into());
                }
            }
        }

        match self
            .writer
            .write(schema.collection, record.id.as_deref(), data, schema.write_mode)
            .await
        {
            Ok(id) => {
                info!(resource = %schema.name, id = %id, uploads = uploaded.len(), "Submission stored");
                Ok(SubmitOutcome { id, urls })
            }
            Err(e) => {
                warn!(resource = %schema.name, error = %e, "Document write failed");
                self.compensate(&uploaded).await;
                Err(e.into())
            }
        }
    }

    /// Delete every object uploaded by the failed request, once each
    async fn compensate(&self, uploaded: &[StoredObject]) {
        if uploaded.is_empty() {
            return;
        }
        let mut removed = 0;
        for object in uploaded {
            if self.uploader.rollback(&object.url).await {
                removed += 1;
            }
        }
        info!(removed, total = uploaded.len(), "Compensation finished");
    }
}

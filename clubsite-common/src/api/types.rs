//! Shared API request/response types
//!
//! The admin client reads `message` from both shapes and shows it verbatim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Successful admin submission
///
/// ```
/// use clubsite_common::api::types::SubmitResponse;
///
/// let response = SubmitResponse::new("Sponsor saved", "sponsor_acme");
/// assert!(response.url.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Human-readable status message
    pub message: String,

    /// Document id that was written
    pub id: String,

    /// Public URL of the uploaded file when exactly one file was stored
    ///
    /// Absent when the request stored no file or several; `urls` always
    /// carries every stored URL, so clients uploading more than one file
    /// read that map instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Public URLs keyed by target document field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub urls: BTreeMap<String, String>,
}

impl SubmitResponse {
    pub fn new(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: id.into(),
            url: None,
            urls: BTreeMap::new(),
        }
    }
}

/// Error response envelope: `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `VALIDATION_ERROR`
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Per-field problems (validation errors only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldErrorBody>,
}

/// One field-level validation problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

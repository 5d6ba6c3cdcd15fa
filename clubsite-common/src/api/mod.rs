//! Shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure credential helpers (no HTTP framework dependencies)
//! - Request/response types shared by server and clients
//!
//! The server crate wraps these with axum extractors and responses.

pub mod auth;
pub mod types;

pub use auth::{
    classify_token, parse_bearer, redact_secrets, token_digest, CredentialError, TokenPreview,
    TokenRejection,
};
pub use types::{ErrorBody, ErrorDetail, FieldErrorBody, SubmitResponse};

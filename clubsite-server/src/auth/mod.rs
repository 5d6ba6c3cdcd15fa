//! Admin identity verification
//!
//! `TokenVerifier` is the seam to the authentication provider. `IdentityVerifier`
//! turns an `Authorization` header into an `AdminIdentity` or an `AuthError`;
//! the `AdminIdentity` extractor runs it for every admin write route before
//! the request body is touched.

pub mod identity_toolkit;
pub mod static_tokens;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use axum::extract::FromRequestParts;
use clubsite_common::api::{parse_bearer, CredentialError, TokenRejection};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::AppState;

pub use identity_toolkit::IdentityToolkitVerifier;
pub use static_tokens::StaticTokenVerifier;

/// Result of a successful provider verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    /// Whether the administrator claim is present and true
    pub is_admin: bool,
}

/// Provider-level verification failures
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    #[error("{0}")]
    Rejected(TokenRejection),

    /// No provider configuration; no network call was made
    #[error("Identity provider not configured: {0}")]
    NotConfigured(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// External authentication provider
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError>;
}

/// An authenticated administrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub subject: String,
}

/// Authorization failures, each with a fixed HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedCredential,

    #[error("{0}")]
    InvalidOrExpiredCredential(TokenRejection),

    #[error("Administrator privileges required")]
    InsufficientPrivilege,

    #[error("Authentication is not configured: {0}")]
    NotConfigured(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidOrExpiredCredential(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPrivilege => StatusCode::FORBIDDEN,
            AuthError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::MalformedCredential => "MALFORMED_CREDENTIAL",
            AuthError::InvalidOrExpiredCredential(_) => "INVALID_OR_EXPIRED_CREDENTIAL",
            AuthError::InsufficientPrivilege => "INSUFFICIENT_PRIVILEGE",
            AuthError::NotConfigured(_) => "NOT_CONFIGURED",
            AuthError::ProviderUnavailable(_) => "IDENTITY_PROVIDER_UNAVAILABLE",
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing => AuthError::MissingCredential,
            CredentialError::Malformed => AuthError::MalformedCredential,
        }
    }
}

/// Flat view of an authorization attempt, used for audit logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub authorized: bool,
    pub subject_id: Option<String>,
    pub error_kind: Option<&'static str>,
    pub status_hint: Option<u16>,
}

impl From<&Result<AdminIdentity, AuthError>> for AuthOutcome {
    fn from(result: &Result<AdminIdentity, AuthError>) -> Self {
        match result {
            Ok(identity) => AuthOutcome {
                authorized: true,
                subject_id: Some(identity.subject.clone()),
                error_kind: None,
                status_hint: None,
            },
            Err(err) => AuthOutcome {
                authorized: false,
                subject_id: None,
                error_kind: Some(err.code()),
                status_hint: Some(err.status().as_u16()),
            },
        }
    }
}

/// Gate for admin requests
pub struct IdentityVerifier {
    verifier: Arc<dyn TokenVerifier>,
    timeout: Duration,
}

impl IdentityVerifier {
    pub fn new(verifier: Arc<dyn TokenVerifier>, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }

    /// Check an `Authorization` header value for a valid administrator token
    pub async fn authorize(&self, header: Option<&str>) -> Result<AdminIdentity, AuthError> {
        let token = parse_bearer(header)?;

        let verified = tokio::time::timeout(self.timeout, self.verifier.verify(token))
            .await
            .map_err(|_| {
                AuthError::ProviderUnavailable(format!(
                    "token verification timed out after {} ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| match e {
                VerifyError::Rejected(rejection) => AuthError::InvalidOrExpiredCredential(rejection),
                VerifyError::NotConfigured(msg) => AuthError::NotConfigured(msg),
                VerifyError::Unavailable(msg) => AuthError::ProviderUnavailable(msg),
            })?;

        if !verified.is_admin {
            return Err(AuthError::InsufficientPrivilege);
        }

        Ok(AdminIdentity {
            subject: verified.subject,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedCredential)?),
        };

        let result = state.verifier.authorize(header).await;
        let outcome = AuthOutcome::from(&result);
        if outcome.authorized {
            info!(
                subject = ?outcome.subject_id,
                method = %parts.method,
                path = %parts.uri.path(),
                "Admin request authorized"
            );
        } else {
            warn!(
                error_kind = ?outcome.error_kind,
                status = ?outcome.status_hint,
                path = %parts.uri.path(),
                "Admin request rejected"
            );
        }
        debug!(outcome = ?outcome, "Authorization outcome");

        Ok(result?)
    }
}

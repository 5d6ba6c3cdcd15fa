//! Bearer credential helpers
//!
//! Pure functions used by the identity verifier:
//! - Extract the token from an `Authorization: Bearer <token>` header
//! - Structurally classify a JWT (segments, payload JSON, `exp`) before the
//!   provider round trip, so expired tokens get a precise message
//! - SHA-256 digests for statically configured admin tokens
//! - Secret redaction for backend error messages
//!
//! Signature verification is never done here; that is the provider's job.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};

// ========================================
// Error Types
// ========================================

/// Problems with the `Authorization` header itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No `Authorization` header present
    Missing,
    /// Header present but not `Bearer <token>`
    Malformed,
}

/// Why a bearer token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    /// Token is structurally valid but past its `exp`
    Expired,
    /// Token is not a decodable JWT
    Malformed,
    /// Account behind the token is disabled or gone
    Revoked,
    /// Provider rejected the token for another reason
    Invalid(String),
}

impl TokenRejection {
    /// Message suitable for showing to the admin user
    pub fn user_message(&self) -> String {
        match self {
            TokenRejection::Expired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            TokenRejection::Malformed => "The authentication token is malformed.".to_string(),
            TokenRejection::Revoked => "This account has been disabled or removed.".to_string(),
            TokenRejection::Invalid(reason) => {
                format!("The authentication token was rejected: {}", reason)
            }
        }
    }
}

impl std::fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

// ========================================
// Header Parsing
// ========================================

/// Extract the bearer token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; the token must be non-empty.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, CredentialError> {
    let header = header.ok_or(CredentialError::Missing)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(CredentialError::Malformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(CredentialError::Malformed);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return Err(CredentialError::Malformed);
    }

    Ok(token)
}

// ========================================
// Token Classification
// ========================================

/// Unverified view of a JWT payload
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPreview {
    /// Subject (user id), if present
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Classify a JWT without verifying its signature
///
/// Returns the decoded payload when the token has three base64url segments
/// and a JSON payload whose `exp` (if any) is still in the future.
pub fn classify_token(token: &str, now_secs: i64) -> Result<TokenPreview, TokenRejection> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(TokenRejection::Malformed);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|_| TokenRejection::Malformed)?;
    let preview: TokenPreview =
        serde_json::from_slice(&payload).map_err(|_| TokenRejection::Malformed)?;

    match preview.exp {
        Some(exp) if exp <= now_secs => Err(TokenRejection::Expired),
        _ => Ok(preview),
    }
}

/// Lowercase hex SHA-256 digest of a token
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Replace every non-empty secret in `message` with `***`
pub fn redact_secrets(message: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(message.to_string(), |acc, secret| acc.replace(secret, "***"))
}

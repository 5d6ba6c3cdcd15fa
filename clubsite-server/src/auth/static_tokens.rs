//! Static admin tokens for the memory backend
//!
//! Tokens are configured as SHA-256 digests so the config file never holds
//! the bearer value itself.

use async_trait::async_trait;
use clubsite_common::api::{token_digest, TokenRejection};
use clubsite_common::config::StaticToken;

use super::{TokenVerifier, VerifiedToken, VerifyError};

pub struct StaticTokenVerifier {
    tokens: Vec<StaticToken>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: Vec<StaticToken>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        if self.tokens.is_empty() {
            return Err(VerifyError::NotConfigured(
                "no static admin tokens configured".to_string(),
            ));
        }

        let digest = token_digest(token);
        self.tokens
            .iter()
            .find(|t| t.sha256.trim().eq_ignore_ascii_case(&digest))
            .map(|t| VerifiedToken {
                subject: t.subject.clone(),
                is_admin: t.admin,
            })
            .ok_or_else(|| VerifyError::Rejected(TokenRejection::Invalid("unknown token".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> StaticTokenVerifier {
        StaticTokenVerifier::new(vec![
            StaticToken {
                sha256: token_digest("admin-secret").to_uppercase(),
                subject: "local-admin".to_string(),
                admin: true,
            },
            StaticToken {
                sha256: token_digest("editor-secret"),
                subject: "local-editor".to_string(),
                admin: false,
            },
        ])
    }

    #[tokio::test]
    async fn test_matching_digest() {
        let verified = verifier().verify("admin-secret").await.unwrap();
        assert_eq!(verified.subject, "local-admin");
        assert!(verified.is_admin);

        let verified = verifier().verify("editor-secret").await.unwrap();
        assert!(!verified.is_admin);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let err = verifier().verify("guess").await.unwrap_err();
        assert!(matches!(err, VerifyError::Rejected(TokenRejection::Invalid(_))));
    }

    #[tokio::test]
    async fn test_empty_list_not_configured() {
        let err = StaticTokenVerifier::new(Vec::new()).verify("x").await.unwrap_err();
        assert!(matches!(err, VerifyError::NotConfigured(_)));
    }
}

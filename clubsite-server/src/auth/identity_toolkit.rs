//! Identity Toolkit token verifier
//!
//! Looks the ID token up via `POST {endpoint}/accounts:lookup?key=<api key>`
//! and reads the administrator flag from the account's custom attributes
//! (a JSON string such as `{"admin": true}`).
//!
//! Tokens are pre-classified locally first, so structurally broken or expired
//! tokens are rejected with a precise reason and no provider round trip.

use async_trait::async_trait;
use clubsite_common::api::{classify_token, TokenRejection};
use clubsite_common::config::AuthConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{TokenVerifier, VerifiedToken, VerifyError};

pub struct IdentityToolkitVerifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    custom_attributes: Option<String>,
}

impl IdentityToolkitVerifier {
    pub fn new(client: Client, config: &AuthConfig) -> Self {
        Self {
            client,
            endpoint: config.identity_endpoint.trim_end_matches('/').to_string(),
            api_key: config.identity_api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Map a provider error message (`TOKEN_EXPIRED`, `INVALID_ID_TOKEN : ...`)
/// to a rejection reason
fn rejection_from_provider(message: &str) -> TokenRejection {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "TOKEN_EXPIRED" => TokenRejection::Expired,
        "INVALID_ID_TOKEN" => TokenRejection::Invalid("invalid ID token".to_string()),
        "USER_NOT_FOUND" | "USER_DISABLED" => TokenRejection::Revoked,
        _ => TokenRejection::Invalid(message.to_string()),
    }
}

/// Whether the custom attributes JSON carries `"admin": true`
fn has_admin_claim(custom_attributes: Option<&str>) -> bool {
    custom_attributes
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|claims| claims.get("admin").and_then(Value::as_bool))
        .unwrap_or(false)
}

#[async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            VerifyError::NotConfigured("identity provider API key is not configured".to_string())
        })?;

        let preview = classify_token(token, chrono::Utc::now().timestamp())
            .map_err(VerifyError::Rejected)?;
        debug!(sub = ?preview.sub, "Token passed structural checks");

        let response = self
            .client
            .post(format!("{}/accounts:lookup", self.endpoint))
            .query(&[("key", api_key)])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            // reqwest errors may echo the URL, which carries the key
            .map_err(|e| VerifyError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VerifyError::Unavailable(format!("provider answered {}", status)));
        }
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(VerifyError::Rejected(rejection_from_provider(message)));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("invalid lookup response: {}", e.without_url())))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(VerifyError::Rejected(TokenRejection::Revoked))?;
        if user.disabled {
            return Err(VerifyError::Rejected(TokenRejection::Revoked));
        }

        Ok(VerifiedToken {
            is_admin: has_admin_claim(user.custom_attributes.as_deref()),
            subject: user.local_id,
        })
    }
}

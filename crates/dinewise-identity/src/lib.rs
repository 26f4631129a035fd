//! ID-token verification against the Firebase / Google Identity Toolkit.
//!
//! The server only needs to know *who* a bearer token belongs to; this crate
//! exposes that as the [`IdentityVerifier`] trait with a production
//! implementation backed by the `accounts:lookup` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the token (expired, malformed, revoked).
    #[error("invalid identity token: {0}")]
    InvalidToken(String),

    /// The token is valid but the account carries no email.
    #[error("identity has no email address")]
    MissingEmail,

    #[error("unexpected HTTP status {status} from identity provider")]
    UnexpectedStatus { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// The account a verified token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl VerifiedIdentity {
    /// Display name, or the email when the account has none.
    #[must_use]
    pub fn name_or_email(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolves an ID token to the identity it was issued for.
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// [`IdentityVerifier`] backed by the Identity Toolkit `accounts:lookup` API.
#[derive(Debug, Clone)]
pub struct FirebaseVerifier {
    client: Client,
    api_key: String,
    lookup_url: Url,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
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
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl FirebaseVerifier {
    /// # Errors
    ///
    /// Returns [`IdentityError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, IdentityError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a verifier with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`IdentityError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("dinewise/0.1 (identity)")
            .build()?;

        let raw = format!("{}/accounts:lookup", base_url.trim_end_matches('/'));
        let lookup_url = Url::parse(&raw).map_err(|e| IdentityError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            lookup_url,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .client
            .post(self.lookup_url.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "token rejected".to_string());
            return Err(IdentityError::InvalidToken(message));
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "identity lookup failed");
            return Err(IdentityError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: LookupResponse =
            serde_json::from_str(&body).map_err(|source| IdentityError::Deserialize {
                context: "accounts:lookup".to_string(),
                source,
            })?;

        let user = parsed
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::InvalidToken("no account for token".to_string()))?;
        let email = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(IdentityError::MissingEmail)?;

        Ok(VerifiedIdentity {
            uid: user.local_id,
            email,
            display_name: user.display_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_or_email_falls_back_on_blank_name() {
        let mut identity = VerifiedIdentity {
            uid: "u".to_string(),
            email: "ada@example.com".to_string(),
            display_name: Some("  ".to_string()),
        };
        assert_eq!(identity.name_or_email(), "ada@example.com");

        identity.display_name = Some("Ada".to_string());
        assert_eq!(identity.name_or_email(), "Ada");
    }

    #[test]
    fn lookup_url_keeps_colon_path() {
        let verifier =
            FirebaseVerifier::with_base_url("k", 5, "http://127.0.0.1:1/v1/").expect("verifier");
        assert_eq!(
            verifier.lookup_url.as_str(),
            "http://127.0.0.1:1/v1/accounts:lookup"
        );
    }
}

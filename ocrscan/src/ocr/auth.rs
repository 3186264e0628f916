use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{OcrError, Result};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for authenticated backends.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed, pre-minted token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// The fields of a Google service-account key file that token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OcrError::Authentication(format!("Invalid service account key: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            OcrError::Authentication(format!(
                "Service account key file {} not readable: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

/// Exchanges a signed service-account assertion for short-lived access tokens.
///
/// The token is cached and refreshed on demand once it is within a minute of
/// expiring. Concurrent callers share one refresh.
pub struct ServiceAccountTokenSource {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, timeout_secs: u64) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            OcrError::Authentication(format!("Invalid service account private key: {e}"))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OcrError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            key,
            encoding_key,
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            cache: Mutex::new(None),
        })
    }

    pub fn from_file(path: impl AsRef<Path>, timeout_secs: u64) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?, timeout_secs)
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| OcrError::Authentication(format!("Failed to sign assertion: {e}")))
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        debug!(token_uri = %self.key.token_uri, "Requesting access token");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| OcrError::Authentication(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Authentication(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Authentication(format!("Invalid token response: {e}")))?;

        let lifetime = token.expires_in.clamp(0, ASSERTION_LIFETIME_SECS);
        let expires_at = chrono::Duration::try_seconds(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                OcrError::Authentication(format!(
                    "Token expiry out of range: {}",
                    token.expires_in
                ))
            })?;

        Ok(CachedToken {
            value: token.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cache = Some(token);
        Ok(value)
    }
}

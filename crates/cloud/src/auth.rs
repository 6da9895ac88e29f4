//! Credentials and IAM token acquisition.
//!
//! Three credential kinds are supported:
//!
//! - a ready IAM token,
//! - an authorized key of a service account (signed into a PS256 JWT and
//!   exchanged at the IAM token endpoint),
//! - an OIDC id token of the CI job, exchanged for an access token of a
//!   service account through the workload identity federation endpoint.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::Endpoints;
use crate::error::CloudError;

/// Audience of service account JWTs.
const JWT_AUDIENCE: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

/// Lifetime of a signed JWT.
const JWT_TTL_SECS: i64 = 3600;

/// Tokens are refreshed when less than this is left.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Assumed lifetime when the token endpoint does not report one.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";
const TOKEN_TYPE_ID_TOKEN: &str = "urn:ietf:params:oauth:token-type:id_token";

// ============================================================================
// Service account key
// ============================================================================

/// Authorized key of a service account, as downloaded from the console.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ServiceAccountKey {
    /// Key ID.
    #[serde(default)]
    pub id: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: String,
    /// Key algorithm (e.g. `RSA_2048`).
    #[serde(default)]
    pub key_algorithm: String,
    /// Owning service account.
    #[serde(default)]
    pub service_account_id: String,
    /// PEM encoded private key.
    #[serde(default)]
    pub private_key: String,
    /// PEM encoded public key.
    #[serde(default)]
    pub public_key: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("id", &self.id)
            .field("service_account_id", &self.service_account_id)
            .field("key_algorithm", &self.key_algorithm)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parse an authorized key JSON document.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or `id`, `private_key` or
    /// `service_account_id` is missing.
    pub fn from_json(data: &str) -> Result<Self, CloudError> {
        let key: Self = serde_json::from_str(data)?;

        let missing: Vec<&str> = [
            ("id", &key.id),
            ("private_key", &key.private_key),
            ("service_account_id", &key.service_account_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(CloudError::Config(format!(
                "service account key is missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(key)
    }

    /// Private key PEM without the warning preamble the console prepends.
    fn private_key_pem(&self) -> &str {
        self.private_key
            .find("-----BEGIN")
            .map_or(self.private_key.as_str(), |start| &self.private_key[start..])
    }

    /// Sign a JWT to exchange for an IAM token.
    ///
    /// # Errors
    /// Returns error if the private key is not a valid RSA PEM.
    pub fn sign_jwt(&self, now: DateTime<Utc>) -> Result<String, CloudError> {
        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(self.id.clone());

        let claims = JwtClaims {
            aud: JWT_AUDIENCE,
            iss: &self.service_account_id,
            iat: now.timestamp(),
            exp: now.timestamp() + JWT_TTL_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key_pem().as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    iat: i64,
    exp: i64,
}

// ============================================================================
// Credentials
// ============================================================================

/// Credentials used to obtain IAM tokens.
#[derive(Clone)]
pub enum Credentials {
    /// Pre-issued IAM token.
    IamToken(String),
    /// Authorized key of a service account.
    ServiceAccountKey(ServiceAccountKey),
    /// OIDC id token exchanged for a service account access token.
    Oidc {
        /// Service account to impersonate.
        service_account_id: String,
        /// Id token issued to the CI job.
        id_token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IamToken(_) => f.write_str("IamToken(***)"),
            Self::ServiceAccountKey(key) => f.debug_tuple("ServiceAccountKey").field(key).finish(),
            Self::Oidc {
                service_account_id, ..
            } => f
                .debug_struct("Oidc")
                .field("service_account_id", service_account_id)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Token exchange wire types
// ============================================================================

#[derive(Serialize)]
struct CreateIamTokenRequest<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIamTokenResponse {
    iam_token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

// ============================================================================
// Token provider
// ============================================================================

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|expires| expires - now > ChronoDuration::seconds(REFRESH_MARGIN_SECS))
    }
}

/// Issues IAM tokens for the configured credentials, caching them until they
/// are close to expiry.
pub struct TokenProvider {
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// Create a provider for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid IAM token, fetching a new one when needed.
    ///
    /// # Errors
    /// Returns error if the token exchange fails.
    pub async fn token(&self, client: &Client, endpoints: &Endpoints) -> Result<String, CloudError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let fresh = match &self.credentials {
            Credentials::IamToken(token) => CachedToken {
                token: token.clone(),
                expires_at: None,
            },
            Credentials::ServiceAccountKey(key) => {
                Self::exchange_jwt(client, endpoints, key, now).await?
            }
            Credentials::Oidc {
                service_account_id,
                id_token,
            } => Self::exchange_id_token(client, endpoints, service_account_id, id_token, now).await?,
        };

        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn exchange_jwt(
        client: &Client,
        endpoints: &Endpoints,
        key: &ServiceAccountKey,
        now: DateTime<Utc>,
    ) -> Result<CachedToken, CloudError> {
        let jwt = key.sign_jwt(now)?;
        let url = format!("{}/iam/v1/tokens", endpoints.iam);
        debug!(url = %url, service_account_id = %key.service_account_id, "Requesting IAM token");

        let response = client
            .post(&url)
            .json(&CreateIamTokenRequest { jwt: &jwt })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CloudError::Auth(format!(
                "failed to create IAM token ({status}): {text}"
            )));
        }

        let body: CreateIamTokenResponse = serde_json::from_str(&text)?;
        info!(service_account_id = %key.service_account_id, "IAM token issued");

        Ok(CachedToken {
            token: body.iam_token,
            expires_at: Some(
                body.expires_at
                    .unwrap_or(now + ChronoDuration::seconds(DEFAULT_TOKEN_TTL_SECS)),
            ),
        })
    }

    async fn exchange_id_token(
        client: &Client,
        endpoints: &Endpoints,
        service_account_id: &str,
        id_token: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedToken, CloudError> {
        let url = format!("{}/oauth/token", endpoints.oauth);
        debug!(url = %url, service_account_id = %service_account_id, "Exchanging OIDC token");

        let form = [
            ("grant_type", GRANT_TYPE_TOKEN_EXCHANGE),
            ("requested_token_type", TOKEN_TYPE_ACCESS_TOKEN),
            ("audience", service_account_id),
            ("subject_token", id_token),
            ("subject_token_type", TOKEN_TYPE_ID_TOKEN),
        ];

        let response = client.post(&url).form(&form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body: TokenExchangeResponse = serde_json::from_str(&text).map_err(|_| {
            CloudError::Auth(format!("token exchange failed ({status}): {text}"))
        })?;

        if let Some(error) = body.error {
            let description = body.error_description.unwrap_or_default();
            return Err(CloudError::Auth(format!(
                "token exchange failed: {error} {description}"
            )));
        }

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CloudError::Auth("token exchange returned no access token".into()))?;

        info!(service_account_id = %service_account_id, "OIDC token exchanged");

        Ok(CachedToken {
            token,
            expires_at: Some(
                now + ChronoDuration::seconds(body.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)),
            ),
        })
    }
}

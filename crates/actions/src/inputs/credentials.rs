use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;
use yc_cloud::{Credentials, Endpoints, ServiceAccountKey, YandexCloud};

use super::optional;

/// How the action authenticates to Yandex Cloud.
#[derive(Args, Clone, Default)]
pub struct CredentialArgs {
    /// Authorized key of a service account, as JSON.
    #[arg(long, env = "YC_SA_JSON_CREDENTIALS", global = true, hide_env_values = true)]
    pub sa_json_credentials: Option<String>,

    /// Ready IAM token.
    #[arg(long, env = "YC_IAM_TOKEN", global = true, hide_env_values = true)]
    pub iam_token: Option<String>,

    /// Service account to impersonate with the job's OIDC token.
    #[arg(long, env = "YC_SA_ID", global = true)]
    pub sa_id: Option<String>,

    /// OIDC id token issued to the job.
    #[arg(long, env = "YC_OIDC_TOKEN", global = true, hide_env_values = true)]
    pub oidc_token: Option<String>,

    /// Send every API call to this base URL instead of the public endpoints.
    #[arg(long, env = "YC_API_ENDPOINT", global = true, hide = true)]
    pub api_endpoint: Option<String>,
}

impl std::fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("sa_json_credentials", &self.sa_json_credentials.as_ref().map(|_| "***"))
            .field("iam_token", &self.iam_token.as_ref().map(|_| "***"))
            .field("sa_id", &self.sa_id)
            .field("oidc_token", &self.oidc_token.as_ref().map(|_| "***"))
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

impl CredentialArgs {
    /// Pick credentials: service account key, then IAM token, then OIDC.
    ///
    /// # Errors
    ///
    /// Fails when none are provided or the key JSON is invalid.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(json) = optional(self.sa_json_credentials.as_ref()) {
            let key = ServiceAccountKey::from_json(json)
                .context("Failed to parse YC_SA_JSON_CREDENTIALS")?;
            debug!(service_account_id = %key.service_account_id, "Using service account key");
            return Ok(Credentials::ServiceAccountKey(key));
        }

        if let Some(token) = optional(self.iam_token.as_ref()) {
            debug!("Using IAM token");
            return Ok(Credentials::IamToken(token.to_string()));
        }

        if let (Some(sa_id), Some(id_token)) = (
            optional(self.sa_id.as_ref()),
            optional(self.oidc_token.as_ref()),
        ) {
            debug!(service_account_id = %sa_id, "Using OIDC token exchange");
            return Ok(Credentials::Oidc {
                service_account_id: sa_id.to_string(),
                id_token: id_token.to_string(),
            });
        }

        bail!("No credentials provided")
    }

    /// Build an API client from these arguments.
    ///
    /// # Errors
    ///
    /// Fails when credentials are missing or the HTTP client cannot be built.
    pub fn client(&self) -> Result<YandexCloud> {
        let client = YandexCloud::new(self.credentials()?)?;
        Ok(match &self.api_endpoint {
            Some(base) if !base.is_empty() => client.with_endpoints(Endpoints::single(base.as_str())),
            _ => client,
        })
    }
}

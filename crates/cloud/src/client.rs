//! Yandex Cloud API client core: endpoints, authenticated requests and
//! operation polling. Service specific calls live in the service modules.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, TokenProvider};
use crate::error::CloudError;
use crate::operation::Operation;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Polling interval when waiting for operations.
const POLL_INTERVAL_SECS: u64 = 2;

/// Default limit for a single operation.
const OPERATION_TIMEOUT_SECS: u64 = 600;

/// Base URLs of the services used by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// IAM (tokens, service accounts).
    pub iam: String,
    /// Operation service.
    pub operation: String,
    /// Serverless functions.
    pub functions: String,
    /// Serverless containers.
    pub containers: String,
    /// API gateways.
    pub api_gateway: String,
    /// Compute cloud.
    pub compute: String,
    /// Object storage.
    pub storage: String,
    /// OAuth token exchange.
    pub oauth: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            iam: "https://iam.api.cloud.yandex.net".to_string(),
            operation: "https://operation.api.cloud.yandex.net".to_string(),
            functions: "https://serverless-functions.api.cloud.yandex.net".to_string(),
            containers: "https://serverless-containers.api.cloud.yandex.net".to_string(),
            api_gateway: "https://serverless-apigateway.api.cloud.yandex.net".to_string(),
            compute: "https://compute.api.cloud.yandex.net".to_string(),
            storage: "https://storage.yandexcloud.net".to_string(),
            oauth: "https://auth.yandex.cloud".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at the same base URL.
    #[must_use]
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            iam: base.clone(),
            operation: base.clone(),
            functions: base.clone(),
            containers: base.clone(),
            api_gateway: base.clone(),
            compute: base.clone(),
            storage: base.clone(),
            oauth: base,
        }
    }
}

/// Yandex Cloud API client.
#[derive(Clone, Debug)]
pub struct YandexCloud {
    /// HTTP client.
    client: Client,
    /// Service base URLs.
    pub(crate) endpoints: Endpoints,
    /// IAM token source.
    tokens: Arc<TokenProvider>,
    /// Delay between operation polls.
    poll_interval: Duration,
    /// Limit for a single operation.
    operation_timeout: Duration,
}

impl YandexCloud {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(credentials: Credentials) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(CloudError::Http)?;

        Ok(Self {
            client,
            endpoints: Endpoints::default(),
            tokens: Arc::new(TokenProvider::new(credentials)),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            operation_timeout: Duration::from_secs(OPERATION_TIMEOUT_SECS),
        })
    }

    /// Use custom service endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the delay between operation polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the limit for a single operation.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Service endpoints in use.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Current IAM token.
    ///
    /// # Errors
    /// Returns error if a token cannot be obtained.
    pub async fn iam_token(&self) -> Result<String, CloudError> {
        self.tokens.token(&self.client, &self.endpoints).await
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, CloudError> {
        let token = self.iam_token().await?;
        Ok(request.bearer_auth(token))
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        debug!(url = %url, "GET request");

        let response = self
            .authorized(self.client.get(url).query(query))
            .await?
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request.
    pub(crate) async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, CloudError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        debug!(url = %url, "POST request");

        let response = self
            .authorized(self.client.post(url).json(body))
            .await?
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated PATCH request.
    pub(crate) async fn patch<T, B>(&self, url: &str, body: &B) -> Result<T, CloudError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        debug!(url = %url, "PATCH request");

        let response = self
            .authorized(self.client.patch(url).json(body))
            .await?
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated DELETE request.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T, CloudError> {
        debug!(url = %url, "DELETE request");

        let response = self
            .authorized(self.client.delete(url))
            .await?
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response.
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CloudError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                CloudError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    /// Map a non-success status to an error.
    pub(crate) fn status_error(status: StatusCode, text: String) -> CloudError {
        if status == StatusCode::NOT_FOUND {
            CloudError::NotFound(text)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            CloudError::Auth(text)
        } else {
            CloudError::Api {
                status: status.as_u16(),
                message: text,
            }
        }
    }

    /// Wait until an operation is done.
    ///
    /// # Errors
    /// Returns error if polling fails, the operation fails or it does not
    /// finish within the operation timeout.
    pub async fn wait_operation(&self, operation: Operation) -> Result<Operation, CloudError> {
        let start = Instant::now();
        let mut operation = operation;

        while !operation.done {
            if start.elapsed() > self.operation_timeout {
                return Err(CloudError::Timeout(self.operation_timeout.as_secs()));
            }

            debug!(
                operation_id = %operation.id,
                description = %operation.description,
                "Waiting for operation"
            );
            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/operations/{}", self.endpoints.operation, operation.id);
            operation = self.get(&url, &[]).await?;
        }

        info!(operation_id = %operation.id, "Operation completed");
        operation.into_result()
    }
}

//! Asynchronous invocation settings of a function version.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Args;
use yc_cloud::functions::{AsyncInvocationConfig, ResponseTarget, YmqTarget};
use yc_cloud::YandexCloud;

use crate::error::InputError;
use crate::inputs::optional;

/// Inputs controlling asynchronous invocation.
#[derive(Args, Debug, Clone, Default)]
pub struct AsyncArgs {
    /// Enable asynchronous invocation.
    #[arg(long = "async", env = "ASYNC", value_parser = BoolishValueParser::new())]
    pub enabled: bool,

    /// Service account used to invoke the function asynchronously.
    #[arg(long, env = "ASYNC_SA_ID")]
    pub async_sa_id: Option<String>,

    /// Name of that service account.
    #[arg(long, env = "ASYNC_SA_NAME")]
    pub async_sa_name: Option<String>,

    /// Number of retries.
    #[arg(long, env = "ASYNC_RETRIES_COUNT", default_value_t = 3)]
    pub async_retries_count: i64,

    /// Queue receiving successful results.
    #[arg(long, env = "ASYNC_SUCCESS_YMQ_ARN")]
    pub async_success_ymq_arn: Option<String>,

    /// Service account writing to the success queue.
    #[arg(long, env = "ASYNC_SUCCESS_SA_ID")]
    pub async_success_sa_id: Option<String>,

    /// Name of that service account.
    #[arg(long, env = "ASYNC_SUCCESS_SA_NAME")]
    pub async_success_sa_name: Option<String>,

    /// Queue receiving failures.
    #[arg(long, env = "ASYNC_FAILURE_YMQ_ARN")]
    pub async_failure_ymq_arn: Option<String>,

    /// Service account writing to the failure queue.
    #[arg(long, env = "ASYNC_FAILURE_SA_ID")]
    pub async_failure_sa_id: Option<String>,

    /// Name of that service account.
    #[arg(long, env = "ASYNC_FAILURE_SA_NAME")]
    pub async_failure_sa_name: Option<String>,
}

/// A YMQ target given by queue ARN and a service account id or name.
struct TargetInputs<'a> {
    label: &'static str,
    arn: Option<&'a str>,
    sa_id: Option<&'a str>,
    sa_name: Option<&'a str>,
}

impl TargetInputs<'_> {
    fn validate(&self) -> Result<(), InputError> {
        if self.arn.is_none() {
            return Ok(());
        }
        let label = self.label;
        match (self.sa_id, self.sa_name) {
            (None, None) => Err(InputError::Conflict(format!(
                "either ASYNC_{label}_SA_ID or ASYNC_{label}_SA_NAME must be set if ASYNC_{label}_YMQ_ARN is set"
            ))),
            (Some(_), Some(_)) => Err(InputError::Conflict(format!(
                "either ASYNC_{label}_SA_ID or ASYNC_{label}_SA_NAME must be set, but not both"
            ))),
            _ => Ok(()),
        }
    }

    async fn resolve(&self, cloud: &YandexCloud, folder_id: &str) -> Result<ResponseTarget> {
        let Some(queue_arn) = self.arn else {
            return Ok(ResponseTarget::empty());
        };

        let service_account_id = cloud
            .resolve_service_account_id(folder_id, self.sa_id, self.sa_name)
            .await
            .with_context(|| format!("Failed to resolve {} service account", self.label.to_lowercase()))?
            .unwrap_or_default();

        Ok(ResponseTarget::YmqTarget(YmqTarget {
            queue_arn: queue_arn.to_string(),
            service_account_id,
        }))
    }
}

impl AsyncArgs {
    fn success(&self) -> TargetInputs<'_> {
        TargetInputs {
            label: "SUCCESS",
            arn: optional(self.async_success_ymq_arn.as_ref()),
            sa_id: optional(self.async_success_sa_id.as_ref()),
            sa_name: optional(self.async_success_sa_name.as_ref()),
        }
    }

    fn failure(&self) -> TargetInputs<'_> {
        TargetInputs {
            label: "FAILURE",
            arn: optional(self.async_failure_ymq_arn.as_ref()),
            sa_id: optional(self.async_failure_sa_id.as_ref()),
            sa_name: optional(self.async_failure_sa_name.as_ref()),
        }
    }

    /// Check that each configured queue has exactly one service account.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Conflict`] describing the bad target.
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.enabled {
            return Ok(());
        }
        self.success().validate()?;
        self.failure().validate()
    }

    /// Build the invocation config, resolving service account names.
    ///
    /// Without an async service account the function's own account is used.
    ///
    /// # Errors
    ///
    /// Returns error if a service account cannot be resolved.
    pub async fn build(
        &self,
        cloud: &YandexCloud,
        folder_id: &str,
        function_service_account: Option<&str>,
    ) -> Result<Option<AsyncInvocationConfig>> {
        if !self.enabled {
            return Ok(None);
        }

        let success_target = self.success().resolve(cloud, folder_id).await?;
        let failure_target = self.failure().resolve(cloud, folder_id).await?;

        let service_account_id = cloud
            .resolve_service_account_id(
                folder_id,
                optional(self.async_sa_id.as_ref()),
                optional(self.async_sa_name.as_ref()),
            )
            .await
            .context("Failed to resolve async service account")?
            .or_else(|| function_service_account.map(ToString::to_string))
            .unwrap_or_default();

        Ok(Some(AsyncInvocationConfig {
            retries_count: self.async_retries_count,
            success_target,
            failure_target,
            service_account_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> AsyncArgs {
        AsyncArgs {
            enabled: true,
            async_retries_count: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_disabled_ignores_targets() {
        let args = AsyncArgs {
            async_success_ymq_arn: Some("yrn:yc:ymq:ru-central1:b1g:ok".into()),
            ..Default::default()
        };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_service_account_for_queue() {
        let args = AsyncArgs {
            async_success_ymq_arn: Some("yrn:yc:ymq:ru-central1:b1g:ok".into()),
            ..enabled()
        };
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "either ASYNC_SUCCESS_SA_ID or ASYNC_SUCCESS_SA_NAME must be set if ASYNC_SUCCESS_YMQ_ARN is set"
        );
    }

    #[test]
    fn test_validate_rejects_both_id_and_name() {
        let args = AsyncArgs {
            async_failure_ymq_arn: Some("yrn:yc:ymq:ru-central1:b1g:dlq".into()),
            async_failure_sa_id: Some("aje1".into()),
            async_failure_sa_name: Some("writer".into()),
            ..enabled()
        };
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "either ASYNC_FAILURE_SA_ID or ASYNC_FAILURE_SA_NAME must be set, but not both"
        );
    }

    #[test]
    fn test_validate_accepts_targets() {
        let args = AsyncArgs {
            async_success_ymq_arn: Some("yrn:yc:ymq:ru-central1:b1g:ok".into()),
            async_success_sa_id: Some("aje1".into()),
            async_failure_ymq_arn: Some("yrn:yc:ymq:ru-central1:b1g:dlq".into()),
            async_failure_sa_name: Some("writer".into()),
            ..enabled()
        };
        assert!(args.validate().is_ok());
    }

    #[tokio::test]
    async fn test_build_falls_back_to_function_service_account() {
        let cloud = YandexCloud::new(yc_cloud::Credentials::IamToken("t1".into())).unwrap();
        let config = enabled()
            .build(&cloud, "b1g", Some("aje-function"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(config.retries_count, 3);
        assert_eq!(config.service_account_id, "aje-function");
        assert_eq!(config.success_target, ResponseTarget::empty());
        assert_eq!(config.failure_target, ResponseTarget::empty());
    }

    #[tokio::test]
    async fn test_build_disabled() {
        let cloud = YandexCloud::new(yc_cloud::Credentials::IamToken("t1".into())).unwrap();
        assert!(AsyncArgs::default().build(&cloud, "b1g", None).await.unwrap().is_none());
    }
}

//! Cloud Functions request and response models.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::models::{int64, Connectivity, LogOptions, Secret};

// ============================================================================
// Functions
// ============================================================================

/// Serverless function.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    /// Function ID.
    pub id: String,
    /// Folder ID.
    #[serde(default)]
    pub folder_id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Invoke URL.
    #[serde(default)]
    pub http_invoke_url: String,
}

/// List functions response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFunctionsResponse {
    /// Functions.
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Create function request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionRequest {
    /// Folder ID.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Metadata of the create function operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionMetadata {
    /// ID of the new function.
    pub function_id: String,
}

// ============================================================================
// Versions
// ============================================================================

/// Compute resources of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Memory in bytes.
    #[serde(with = "int64")]
    pub memory: i64,
}

/// Package stored in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Bucket name.
    pub bucket_name: String,
    /// Object key.
    pub object_name: String,
}

/// Where the version code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PackageSource {
    /// Zip archive in object storage.
    Package(Package),
    /// Base64 encoded zip archive.
    Content(String),
}

impl PackageSource {
    /// Inline zip archive.
    #[must_use]
    pub fn inline(zip: &[u8]) -> Self {
        Self::Content(base64::engine::general_purpose::STANDARD.encode(zip))
    }
}

/// Queue that receives async invocation results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YmqTarget {
    /// Message queue ARN.
    pub queue_arn: String,
    /// Service account allowed to write to the queue.
    pub service_account_id: String,
}

/// Marker for "discard results".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmptyTarget {}

/// Destination of async invocation results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseTarget {
    /// Results are dropped.
    EmptyTarget(EmptyTarget),
    /// Results go to a message queue.
    YmqTarget(YmqTarget),
}

impl ResponseTarget {
    /// Target dropping results.
    #[must_use]
    pub fn empty() -> Self {
        Self::EmptyTarget(EmptyTarget {})
    }
}

/// Async invocation settings of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncInvocationConfig {
    /// Retries before a call is considered failed.
    #[serde(with = "int64")]
    pub retries_count: i64,
    /// Destination of successful results.
    pub success_target: ResponseTarget,
    /// Destination of failures.
    pub failure_target: ResponseTarget,
    /// Service account used to invoke the function.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
}

/// Create function version request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionVersionRequest {
    /// Function ID.
    pub function_id: String,
    /// Runtime, e.g. `nodejs18`.
    pub runtime: String,
    /// Handler, e.g. `index.handler`.
    pub entrypoint: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Compute resources.
    pub resources: Resources,
    /// Execution timeout, e.g. `"5s"`.
    pub execution_timeout: String,
    /// Service account of the version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
    /// Code source.
    #[serde(flatten)]
    pub package_source: PackageSource,
    /// Environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Version tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    /// Lockbox secrets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
    /// Network attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<Connectivity>,
    /// Logging options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_options: Option<LogOptions>,
    /// Async invocation settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_invocation_config: Option<AsyncInvocationConfig>,
}

/// Metadata of the create version operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFunctionVersionMetadata {
    /// ID of the new version.
    pub function_version_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_targets_wire_format() {
        let config = AsyncInvocationConfig {
            retries_count: 3,
            success_target: ResponseTarget::YmqTarget(YmqTarget {
                queue_arn: "yrn:yc:ymq:ru-central1:b1g:ok".into(),
                service_account_id: "aje1".into(),
            }),
            failure_target: ResponseTarget::empty(),
            service_account_id: String::new(),
        };

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({
                "retriesCount": "3",
                "successTarget": {"ymqTarget": {
                    "queueArn": "yrn:yc:ymq:ru-central1:b1g:ok",
                    "serviceAccountId": "aje1"
                }},
                "failureTarget": {"emptyTarget": {}}
            })
        );
    }

    #[test]
    fn test_package_source_is_flattened() {
        let request = CreateFunctionVersionRequest {
            function_id: "d4e1".into(),
            runtime: "nodejs18".into(),
            entrypoint: "index.handler".into(),
            description: String::new(),
            resources: Resources { memory: 134_217_728 },
            execution_timeout: "5s".into(),
            service_account_id: String::new(),
            package_source: PackageSource::inline(b"PK"),
            environment: BTreeMap::new(),
            tag: Vec::new(),
            secrets: Vec::new(),
            connectivity: None,
            log_options: None,
            async_invocation_config: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["content"], "UEs=");
        assert_eq!(json["resources"]["memory"], "134217728");
        assert!(json.get("package").is_none());
        assert!(json.get("environment").is_none());
    }
}

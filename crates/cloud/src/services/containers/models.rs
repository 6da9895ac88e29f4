//! Serverless Containers request and response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{int64, AccessBinding, Connectivity, LogOptions, Secret};

/// Serverless container.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container ID.
    pub id: String,
    /// Folder ID.
    #[serde(default)]
    pub folder_id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Invoke URL.
    #[serde(default)]
    pub url: String,
}

/// List containers response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContainersResponse {
    /// Containers.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Create container request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerRequest {
    /// Folder ID.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Metadata of the create container operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerMetadata {
    /// ID of the new container.
    pub container_id: String,
}

/// Compute resources of a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Memory in bytes.
    #[serde(with = "int64")]
    pub memory: i64,
    /// Number of cores.
    #[serde(with = "int64")]
    pub cores: i64,
    /// Guaranteed core share, percent.
    #[serde(with = "int64")]
    pub core_fraction: i64,
}

/// Entrypoint override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// Command line.
    pub command: Vec<String>,
}

/// Arguments override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Args {
    /// Arguments.
    pub args: Vec<String>,
}

/// Image and process settings of a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Image URL.
    pub image_url: String,
    /// Entrypoint override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    /// Arguments override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    /// Environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Working directory.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
}

/// Pre-warmed instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionPolicy {
    /// Minimum number of instances.
    #[serde(with = "int64")]
    pub min_instances: i64,
}

/// Object storage bucket mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMount {
    /// Bucket name.
    pub bucket_id: String,
    /// Prefix inside the bucket.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Mount point inside the container.
    pub mount_point_path: String,
    /// Mount read-only.
    pub read_only: bool,
}

/// Deploy revision request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRevisionRequest {
    /// Container ID.
    pub container_id: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Compute resources.
    pub resources: Resources,
    /// Request timeout, e.g. `"3s"`.
    pub execution_timeout: String,
    /// Service account of the revision.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
    /// Image settings.
    pub image_spec: ImageSpec,
    /// Concurrent requests per instance.
    #[serde(with = "int64")]
    pub concurrency: i64,
    /// Lockbox secrets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
    /// Network attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<Connectivity>,
    /// Pre-warmed instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision_policy: Option<ProvisionPolicy>,
    /// Logging options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_options: Option<LogOptions>,
    /// Mounted buckets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub storage_mounts: Vec<StorageMount>,
}

/// Deployed revision.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    /// Revision ID.
    pub id: String,
    /// Owning container.
    #[serde(default)]
    pub container_id: String,
    /// Revision status.
    #[serde(default)]
    pub status: String,
}

/// Metadata of the deploy revision operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployContainerRevisionMetadata {
    /// ID of the new revision.
    pub container_revision_id: String,
}

/// Replace all access bindings of a container.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAccessBindingsRequest {
    /// New bindings.
    pub access_bindings: Vec<AccessBinding>,
}

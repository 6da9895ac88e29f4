//! Deploy a serverless function version from workspace sources.

mod async_invocation;

pub use async_invocation::AsyncArgs;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::builder::BoolishValueParser;
use clap::Args;
use tracing::info;
use yc_cloud::functions::{
    CreateFunctionRequest, CreateFunctionVersionRequest, Package, PackageSource, Resources,
    MAX_INLINE_PACKAGE_BYTES,
};
use yc_cloud::models::duration_secs;
use yc_cloud::{Connectivity, LogDestination, LogOptions, ObjectStore, StorageObject, YandexCloud};

use crate::inputs::{
    optional, parse_environment, parse_log_level, parse_memory, parse_secrets, required,
};
use crate::sources::{build_zip, SourceSelector};
use crate::workflow::{group, RunnerContext};

/// Inputs of the function action.
#[derive(Args, Debug, Clone, Default)]
pub struct FunctionArgs {
    /// Folder holding the function.
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Function name; created when missing.
    #[arg(long, env = "FUNCTION_NAME")]
    pub function_name: Option<String>,

    /// Runtime, e.g. `nodejs18`.
    #[arg(long, env = "RUNTIME")]
    pub runtime: Option<String>,

    /// Handler, e.g. `index.handler`.
    #[arg(long, env = "ENTRYPOINT")]
    pub entrypoint: Option<String>,

    /// Memory limit.
    #[arg(long, env = "MEMORY", default_value = "128Mb")]
    pub memory: String,

    /// Globs of files to package, relative to the source root.
    #[arg(long, env = "INCLUDE", value_delimiter = '\n', default_value = ".")]
    pub include: Vec<String>,

    /// Globs of files to leave out.
    #[arg(long, env = "EXCLUDE", value_delimiter = '\n')]
    pub exclude: Vec<String>,

    /// Source directory inside the workspace.
    #[arg(long, env = "SOURCE_ROOT", default_value = ".")]
    pub source_root: String,

    /// Execution timeout in seconds.
    #[arg(long, env = "EXECUTION_TIMEOUT", default_value_t = 5)]
    pub execution_timeout: i64,

    /// `KEY=VALUE` environment lines.
    #[arg(long, env = "ENVIRONMENT", value_delimiter = '\n')]
    pub environment: Vec<String>,

    /// Service account the function runs as.
    #[arg(long, env = "SERVICE_ACCOUNT")]
    pub service_account: Option<String>,

    /// Name of that service account.
    #[arg(long, env = "SERVICE_ACCOUNT_NAME")]
    pub service_account_name: Option<String>,

    /// Bucket for the package; required for packages over 3.5 MiB.
    #[arg(long, env = "BUCKET")]
    pub bucket: Option<String>,

    /// Description of the function and version.
    #[arg(long, env = "DESCRIPTION")]
    pub description: Option<String>,

    /// Lockbox references, `ENV=secretId/versionId/key`.
    #[arg(long, env = "SECRETS", value_delimiter = '\n')]
    pub secrets: Vec<String>,

    /// VPC network.
    #[arg(long, env = "NETWORK_ID")]
    pub network_id: Option<String>,

    /// Version tags.
    #[arg(long, env = "TAGS", value_delimiter = '\n')]
    pub tags: Vec<String>,

    /// Disable logging.
    #[arg(long, env = "LOGS_DISABLED", value_parser = BoolishValueParser::new())]
    pub logs_disabled: bool,

    /// Log group for function logs.
    #[arg(long, env = "LOGS_GROUP_ID")]
    pub logs_group_id: Option<String>,

    /// Minimum log level.
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub async_invocation: AsyncArgs,
}

/// Result of a function deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeployment {
    /// Function ID.
    pub function_id: String,
    /// Created version ID.
    pub version_id: String,
}

/// Package sources and deploy a new function version.
///
/// # Errors
///
/// Returns error on invalid inputs, packaging failures or API errors.
pub async fn run(
    cloud: &YandexCloud,
    ctx: &RunnerContext,
    args: &FunctionArgs,
) -> Result<FunctionDeployment> {
    let folder_id = required(args.folder_id.as_ref(), "FOLDER_ID")?;
    let name = required(args.function_name.as_ref(), "FUNCTION_NAME")?;
    let runtime = required(args.runtime.as_ref(), "RUNTIME")?;
    let entrypoint = required(args.entrypoint.as_ref(), "ENTRYPOINT")?;
    let memory = parse_memory(&args.memory)?;
    let log_level = parse_log_level(args.log_level.as_deref().unwrap_or_default())?;
    let environment = parse_environment(&args.environment)?;
    let secrets = parse_secrets(&args.secrets)?;
    args.async_invocation
        .validate()
        .context("Invalid async configuration")?;
    info!(function = %name, memory, timeout = args.execution_timeout, "Function inputs set");

    let archive = {
        let _group = group("ZipDirectory");
        let files = SourceSelector::new(ctx.resolve(&args.source_root))
            .include(&args.include)
            .exclude(&args.exclude)?
            .select()?;
        build_zip(&files).context("Failed to zip sources")?
    };
    info!(bytes = archive.len(), "Package size");

    let outputs = ctx.outputs();
    let description = optional(args.description.as_ref()).unwrap_or_default();

    let function_id = {
        let _group = group("Find function id");
        find_or_create_function(cloud, folder_id, name, description).await?
    };
    outputs.set("function-id", &function_id);

    let package_source = package_source(
        cloud,
        ctx,
        optional(args.bucket.as_ref()),
        &function_id,
        archive,
    )
    .await?;

    let version_id = {
        let _group = group("Create function version");

        let service_account = cloud
            .resolve_service_account_id(
                folder_id,
                optional(args.service_account.as_ref()),
                optional(args.service_account_name.as_ref()),
            )
            .await
            .context("Failed to resolve service account")?;

        let async_invocation_config = args
            .async_invocation
            .build(cloud, folder_id, service_account.as_deref())
            .await?;

        let request = CreateFunctionVersionRequest {
            function_id: function_id.clone(),
            runtime: runtime.to_string(),
            entrypoint: entrypoint.to_string(),
            description: description.to_string(),
            resources: Resources { memory },
            execution_timeout: duration_secs(args.execution_timeout),
            service_account_id: service_account.unwrap_or_default(),
            package_source,
            environment,
            tag: args
                .tags
                .iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            secrets,
            connectivity: optional(args.network_id.as_ref()).map(|network_id| Connectivity {
                network_id: network_id.to_string(),
                subnet_id: Vec::new(),
            }),
            log_options: Some(LogOptions {
                disabled: args.logs_disabled,
                destination: optional(args.logs_group_id.as_ref())
                    .map(|id| LogDestination::LogGroupId(id.to_string())),
                min_level: log_level,
            }),
            async_invocation_config,
        };

        cloud
            .create_function_version(&request)
            .await
            .context("Failed to create function version")?
    };
    outputs.set("version-id", &version_id);
    outputs.set("time", &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

    Ok(FunctionDeployment {
        function_id,
        version_id,
    })
}

async fn find_or_create_function(
    cloud: &YandexCloud,
    folder_id: &str,
    name: &str,
    description: &str,
) -> Result<String> {
    if let Some(function) = cloud
        .find_function_by_name(folder_id, name)
        .await
        .context("Failed to list functions")?
    {
        info!(function_id = %function.id, name = %name, "Function already exists");
        return Ok(function.id);
    }

    let function_id = cloud
        .create_function(&CreateFunctionRequest {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        })
        .await
        .context("Failed to create function")?;
    info!(function_id = %function_id, name = %name, "Function was missing and has been created");
    Ok(function_id)
}

/// Inline the archive, or upload it when a bucket is configured.
async fn package_source(
    store: &dyn ObjectStore,
    ctx: &RunnerContext,
    bucket: Option<&str>,
    function_id: &str,
    archive: Vec<u8>,
) -> Result<PackageSource> {
    match bucket {
        Some(bucket) => {
            let object_name = upload_package(store, ctx, bucket, function_id, archive).await?;
            Ok(PackageSource::Package(Package {
                bucket_name: bucket.to_string(),
                object_name,
            }))
        }
        None => {
            if archive.len() > MAX_INLINE_PACKAGE_BYTES {
                bail!("zip file is too big: {} bytes. Provide bucket name", archive.len());
            }
            Ok(PackageSource::inline(&archive))
        }
    }
}

/// Upload the package as `<function id>/<commit sha>.zip`.
async fn upload_package(
    store: &dyn ObjectStore,
    ctx: &RunnerContext,
    bucket: &str,
    function_id: &str,
    archive: Vec<u8>,
) -> Result<String> {
    let sha = ctx
        .commit_sha
        .as_deref()
        .filter(|sha| !sha.is_empty())
        .context("missing SOURCECRAFT_COMMIT_SHA")?;

    let object_name = format!("{function_id}/{sha}.zip");
    info!(bucket = %bucket, object = %object_name, "Uploading package");

    store
        .put_object(
            StorageObject::new(bucket, &object_name, archive).with_content_type("application/zip"),
        )
        .await
        .context("Failed to upload to S3")?;
    Ok(object_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use yc_cloud::CloudError;

    mock! {
        pub Store {}

        #[async_trait]
        impl ObjectStore for Store {
            async fn put_object(&self, object: StorageObject) -> Result<(), CloudError>;
            async fn get_object(&self, bucket: &str, key: &str) -> Result<StorageObject, CloudError>;
            async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, CloudError>;
            async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), CloudError>;
        }
    }

    fn oversized() -> Vec<u8> {
        vec![0; MAX_INLINE_PACKAGE_BYTES + 1]
    }

    #[tokio::test]
    async fn test_small_package_is_inlined() {
        let store = MockStore::new();
        let source = package_source(&store, &RunnerContext::default(), None, "d4e1", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(source, PackageSource::Content("AQID".to_string()));
    }

    #[tokio::test]
    async fn test_oversized_package_without_bucket_is_rejected() {
        let store = MockStore::new();
        let err = package_source(&store, &RunnerContext::default(), None, "d4e1", oversized())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "zip file is too big: {} bytes. Provide bucket name",
                MAX_INLINE_PACKAGE_BYTES + 1
            )
        );
    }

    #[tokio::test]
    async fn test_oversized_package_goes_to_bucket() {
        let mut store = MockStore::new();
        store
            .expect_put_object()
            .withf(|object| {
                object.bucket == "packages"
                    && object.key == "d4e1/4f2a9c1.zip"
                    && object.body.len() == MAX_INLINE_PACKAGE_BYTES + 1
                    && object.content_type.as_deref() == Some("application/zip")
            })
            .times(1)
            .returning(|_| Ok(()));

        let ctx = RunnerContext {
            commit_sha: Some("4f2a9c1".into()),
            ..RunnerContext::default()
        };
        let source = package_source(&store, &ctx, Some("packages"), "d4e1", oversized())
            .await
            .unwrap();
        assert_eq!(
            source,
            PackageSource::Package(Package {
                bucket_name: "packages".into(),
                object_name: "d4e1/4f2a9c1.zip".into(),
            })
        );
    }
}

//! Deploy a serverless container revision.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Args;
use tracing::info;
use yc_cloud::containers::{
    Args as ContainerArgs, Command, CreateContainerRequest, DeployRevisionRequest, ImageSpec,
    ProvisionPolicy, Resources, StorageMount, INVOKER_ROLE,
};
use yc_cloud::models::duration_secs;
use yc_cloud::{
    AccessBinding, Connectivity, LogDestination, LogOptions, Secret, Subject, YandexCloud,
};

use crate::error::InputError;
use crate::inputs::{
    non_empty_lines, optional, parse_environment, parse_log_level, parse_memory, parse_secrets,
    parse_storage_mounts, required,
};
use crate::workflow::{group, RunnerContext};

/// Inputs of the container action.
#[derive(Args, Debug, Clone, Default)]
pub struct ContainerActionArgs {
    /// Folder holding the container.
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Container name; created when missing.
    #[arg(long, env = "CONTAINER_NAME")]
    pub container_name: Option<String>,

    /// Allow unauthenticated invocation.
    #[arg(long, env = "PUBLIC", value_parser = BoolishValueParser::new())]
    pub public: bool,

    #[command(flatten)]
    pub revision: RevisionArgs,
}

/// Revision settings.
#[derive(Args, Debug, Clone, Default)]
pub struct RevisionArgs {
    /// Image to run.
    #[arg(long, env = "REVISION_IMAGE_URL")]
    pub revision_image_url: Option<String>,

    /// Memory limit.
    #[arg(long, env = "REVISION_MEMORY", default_value = "128Mb")]
    pub revision_memory: String,

    /// CPU cores.
    #[arg(long, env = "REVISION_CORES", default_value_t = 1)]
    pub revision_cores: i64,

    /// Guaranteed CPU share, percent.
    #[arg(long, env = "REVISION_CORE_FRACTION", default_value_t = 100)]
    pub revision_core_fraction: i64,

    /// Concurrent requests per instance.
    #[arg(long, env = "REVISION_CONCURRENCY", default_value_t = 1)]
    pub revision_concurrency: i64,

    /// Request timeout in seconds.
    #[arg(long, env = "REVISION_EXECUTION_TIMEOUT", default_value_t = 3)]
    pub revision_execution_timeout: i64,

    /// Working directory inside the image.
    #[arg(long, env = "REVISION_WORKING_DIR")]
    pub revision_working_dir: Option<String>,

    /// Entrypoint override, one element per line.
    #[arg(long, env = "REVISION_COMMANDS", value_delimiter = '\n')]
    pub revision_commands: Vec<String>,

    /// Arguments, one per line.
    #[arg(long, env = "REVISION_ARGS", value_delimiter = '\n')]
    pub revision_args: Vec<String>,

    /// `KEY=VALUE` environment lines.
    #[arg(long, env = "REVISION_ENV", value_delimiter = '\n')]
    pub revision_env: Vec<String>,

    /// Lockbox references, `ENV=secretId/versionId/key`.
    #[arg(long, env = "REVISION_SECRETS", value_delimiter = '\n')]
    pub revision_secrets: Vec<String>,

    /// Instances kept warm.
    #[arg(long, env = "REVISION_PROVISIONED")]
    pub revision_provisioned: Option<i64>,

    /// VPC network.
    #[arg(long, env = "REVISION_NETWORK_ID")]
    pub revision_network_id: Option<String>,

    /// Service account the revision runs as.
    #[arg(long, env = "REVISION_SERVICE_ACCOUNT_ID")]
    pub revision_service_account_id: Option<String>,

    /// Disable logging.
    #[arg(long, env = "REVISION_LOG_OPTIONS_DISABLED", value_parser = BoolishValueParser::new())]
    pub revision_log_options_disabled: bool,

    /// Log group for revision logs.
    #[arg(long, env = "REVISION_LOG_OPTIONS_LOG_GROUP_ID")]
    pub revision_log_options_log_group_id: Option<String>,

    /// Folder whose default log group receives the logs.
    #[arg(long, env = "REVISION_LOG_OPTIONS_FOLDER_ID")]
    pub revision_log_options_folder_id: Option<String>,

    /// Minimum log level.
    #[arg(long, env = "REVISION_LOG_OPTIONS_MIN_LEVEL")]
    pub revision_log_options_min_level: Option<String>,

    /// Bucket mounts, `bucket[/prefix]:mount_path[:mode]`.
    #[arg(long, env = "REVISION_STORAGE_MOUNTS", value_delimiter = '\n')]
    pub revision_storage_mounts: Vec<String>,
}

/// Validated revision settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionOptions {
    pub image_url: String,
    pub memory: i64,
    pub cores: i64,
    pub core_fraction: i64,
    pub concurrency: i64,
    pub execution_timeout: i64,
    pub working_dir: String,
    pub commands: Vec<String>,
    pub args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub secrets: Vec<Secret>,
    pub provisioned: Option<i64>,
    pub network_id: Option<String>,
    pub service_account_id: String,
    pub log_options: LogOptions,
    pub storage_mounts: Vec<StorageMount>,
}

impl RevisionArgs {
    /// Validate and parse the revision inputs.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] for missing or malformed inputs.
    pub fn parse(&self) -> Result<RevisionOptions, InputError> {
        let image_url = required(self.revision_image_url.as_ref(), "REVISION_IMAGE_URL")?;

        let log_group_id = optional(self.revision_log_options_log_group_id.as_ref());
        let log_folder_id = optional(self.revision_log_options_folder_id.as_ref());
        let destination = match (log_group_id, log_folder_id) {
            (Some(_), Some(_)) => {
                return Err(InputError::Conflict(
                    "both log group ID and folder ID are provided, please set only one of them"
                        .to_string(),
                ))
            }
            (Some(id), None) => Some(LogDestination::LogGroupId(id.to_string())),
            (None, Some(id)) => Some(LogDestination::FolderId(id.to_string())),
            (None, None) => None,
        };

        let lines = |items: &[String]| -> Vec<String> {
            non_empty_lines(items).map(ToString::to_string).collect()
        };

        Ok(RevisionOptions {
            image_url: image_url.to_string(),
            memory: parse_memory(&self.revision_memory)?,
            cores: self.revision_cores,
            core_fraction: self.revision_core_fraction,
            concurrency: self.revision_concurrency,
            execution_timeout: self.revision_execution_timeout,
            working_dir: optional(self.revision_working_dir.as_ref())
                .unwrap_or_default()
                .to_string(),
            commands: lines(&self.revision_commands),
            args: lines(&self.revision_args),
            environment: parse_environment(&self.revision_env)?,
            secrets: parse_secrets(&self.revision_secrets)?,
            provisioned: self.revision_provisioned,
            network_id: optional(self.revision_network_id.as_ref()).map(ToString::to_string),
            service_account_id: optional(self.revision_service_account_id.as_ref())
                .unwrap_or_default()
                .to_string(),
            log_options: LogOptions {
                disabled: self.revision_log_options_disabled,
                destination,
                min_level: parse_log_level(
                    self.revision_log_options_min_level
                        .as_deref()
                        .unwrap_or_default(),
                )?,
            },
            storage_mounts: parse_storage_mounts(&self.revision_storage_mounts)?,
        })
    }
}

impl RevisionOptions {
    /// Log the settings the revision is deployed with.
    pub fn log(&self) {
        info!(
            image_url = %self.image_url,
            memory = self.memory,
            cores = self.cores,
            core_fraction = self.core_fraction,
            concurrency = self.concurrency,
            execution_timeout = self.execution_timeout,
            "Revision options"
        );
        if !self.working_dir.is_empty() {
            info!(working_dir = %self.working_dir, "Working directory");
        }
        if !self.commands.is_empty() || !self.args.is_empty() {
            info!(commands = ?self.commands, args = ?self.args, "Command override");
        }
        if !self.environment.is_empty() {
            info!(keys = ?self.environment.keys().collect::<Vec<_>>(), "Environment variables");
        }
        if !self.secrets.is_empty() {
            info!(count = self.secrets.len(), "Secrets");
        }
        if let Some(provisioned) = self.provisioned {
            info!(provisioned, "Provisioned instances");
        }
        if let Some(network_id) = &self.network_id {
            info!(network_id = %network_id, "Network");
        }
        if !self.service_account_id.is_empty() {
            info!(service_account_id = %self.service_account_id, "Service account");
        }
        if self.log_options.disabled {
            info!("Logging is disabled");
        } else {
            info!(
                destination = ?self.log_options.destination,
                min_level = %self.log_options.min_level,
                "Log options"
            );
        }
        for mount in &self.storage_mounts {
            info!(
                bucket = %mount.bucket_id,
                prefix = %mount.prefix,
                mount_point = %mount.mount_point_path,
                read_only = mount.read_only,
                "Storage mount"
            );
        }
    }

    /// Deploy request for the given container.
    #[must_use]
    pub fn into_request(self, container_id: &str) -> DeployRevisionRequest {
        DeployRevisionRequest {
            container_id: container_id.to_string(),
            description: String::new(),
            resources: Resources {
                memory: self.memory,
                cores: self.cores,
                core_fraction: self.core_fraction,
            },
            execution_timeout: duration_secs(self.execution_timeout),
            service_account_id: self.service_account_id,
            image_spec: ImageSpec {
                image_url: self.image_url,
                command: (!self.commands.is_empty()).then_some(Command {
                    command: self.commands,
                }),
                args: (!self.args.is_empty()).then_some(ContainerArgs { args: self.args }),
                environment: self.environment,
                working_dir: self.working_dir,
            },
            concurrency: self.concurrency,
            secrets: self.secrets,
            connectivity: self.network_id.map(|network_id| Connectivity {
                network_id,
                subnet_id: Vec::new(),
            }),
            provision_policy: self
                .provisioned
                .map(|min_instances| ProvisionPolicy { min_instances }),
            log_options: Some(self.log_options),
            storage_mounts: self.storage_mounts,
        }
    }
}

/// Result of a container deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDeployment {
    /// Container ID.
    pub container_id: String,
    /// Deployed revision ID.
    pub revision_id: String,
}

/// Find or create the container and deploy a revision to it.
///
/// # Errors
///
/// Returns error on invalid inputs or API errors.
pub async fn run(
    cloud: &YandexCloud,
    ctx: &RunnerContext,
    args: &ContainerActionArgs,
) -> Result<ContainerDeployment> {
    let folder_id = required(args.folder_id.as_ref(), "FOLDER_ID")?;
    let name = required(args.container_name.as_ref(), "CONTAINER_NAME")?;
    let options = args
        .revision
        .parse()
        .context("Failed to parse revision options")?;

    let container_id = {
        let _group = group("Find container");
        let existing = cloud
            .find_container_by_name(folder_id, name)
            .await
            .context("Failed to find container")?;
        options.log();

        match existing {
            Some(container) => {
                info!(container_id = %container.id, name = %name, "Container already exists");
                container.id
            }
            None => {
                info!(name = %name, "There is no container with this name, creating a new one");
                let id = cloud
                    .create_container(&CreateContainerRequest {
                        folder_id: folder_id.to_string(),
                        name: name.to_string(),
                        description: ctx.created_from(),
                    })
                    .await
                    .context("Failed to create container")?;
                info!(container_id = %id, "Container created");
                id
            }
        }
    };

    let revision = {
        let _group = group("Deploy revision");
        cloud
            .deploy_revision(&options.into_request(&container_id))
            .await
            .context("Failed to create revision")?
    };
    info!(revision_id = %revision.id, "Revision created");

    let outputs = ctx.outputs();
    outputs.set("CONTAINER_ID", &container_id);
    outputs.set("REVISION_ID", &revision.id);

    if args.public {
        info!(container_id = %container_id, "Making container public");
        cloud
            .set_container_access_bindings(
                &container_id,
                vec![AccessBinding {
                    role_id: INVOKER_ROLE.to_string(),
                    subject: Subject {
                        id: "allUsers".to_string(),
                        kind: "system".to_string(),
                    },
                }],
            )
            .await
            .context("Failed to make container public")?;
        info!("Container is public now");
    }

    Ok(ContainerDeployment {
        container_id,
        revision_id: revision.id,
    })
}

//! Ephemeral VM hosting a self-hosted CI runner.
//!
//! `start` creates a VM whose user data registers a runner tagged with a
//! fresh label; `stop` deletes it again.

mod user_data;

pub use user_data::{build_user_data, UserDataParams, DEFAULT_RUNNER_VERSION, RUNNER_DOWNLOAD_BASE};

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::builder::BoolishValueParser;
use clap::Args;
use rand::Rng;
use tracing::info;
use yc_cloud::compute::{
    AttachedDiskSpec, CreateInstanceRequest, DiskSpec, NetworkInterfaceSpec, OneToOneNatSpec,
    PrimaryAddressSpec, ResourcesSpec,
};
use yc_cloud::YandexCloud;

use crate::error::InputError;
use crate::inputs::{optional, parse_memory, parse_ttl, required};
use crate::workflow::{group, RunnerContext};

/// Label holding the unix time after which the VM may be reaped.
pub const EXPIRES_LABEL: &str = "expires";

/// What the action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Start,
    Stop,
}

impl FromStr for Mode {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(InputError::Mode(other.to_string())),
        }
    }
}

/// Inputs of the runner action.
#[derive(Args, Debug, Clone, Default)]
pub struct RunnerArgs {
    /// `start` or `stop`.
    #[arg(long, env = "MODE")]
    pub mode: Option<String>,

    /// Token of the CI service.
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Runner registration token; defaults to `GITHUB_TOKEN`.
    #[arg(long, env = "PAT_TOKEN")]
    pub pat_token: Option<String>,

    /// Folder of the VM.
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Boot image.
    #[arg(long, env = "IMAGE_ID")]
    pub image_id: Option<String>,

    /// Subnet of the network interface.
    #[arg(long, env = "SUBNET_ID")]
    pub subnet_id: Option<String>,

    /// Availability zone.
    #[arg(long, env = "ZONE_ID", default_value = "ru-central1-a")]
    pub zone_id: String,

    /// Attach a public address.
    #[arg(long, env = "PUBLIC_IP", value_parser = BoolishValueParser::new())]
    pub public_ip: bool,

    /// Hardware platform.
    #[arg(long, env = "PLATFORM_ID", default_value = "standard-v3")]
    pub platform_id: String,

    /// CPU cores.
    #[arg(long, env = "CORES", default_value_t = 2)]
    pub cores: i64,

    /// Memory.
    #[arg(long, env = "MEMORY", default_value = "1Gb")]
    pub memory: String,

    /// Guaranteed CPU share, percent.
    #[arg(long, env = "CORE_FRACTION", default_value_t = 100)]
    pub core_fraction: i64,

    /// Boot disk type.
    #[arg(long, env = "DISK_TYPE", default_value = "network-ssd")]
    pub disk_type: String,

    /// Boot disk size.
    #[arg(long, env = "DISK_SIZE", default_value = "30Gb")]
    pub disk_size: String,

    /// Image of the secondary disk.
    #[arg(long, env = "IMAGE2_ID")]
    pub image2_id: Option<String>,

    /// Secondary disk type.
    #[arg(long, env = "DISK2_TYPE", default_value = "network-ssd")]
    pub disk2_type: String,

    /// Secondary disk size; `0Gb` means no secondary disk.
    #[arg(long, env = "DISK2_SIZE", default_value = "0Gb")]
    pub disk2_size: String,

    /// Service account attached to the VM.
    #[arg(long, env = "SERVICE_ACCOUNT_ID")]
    pub service_account_id: Option<String>,

    /// Directory of a runner pre-installed in the image.
    #[arg(long, env = "RUNNER_HOME_DIR")]
    pub runner_home_dir: Option<String>,

    /// Runner version to download.
    #[arg(long, env = "RUNNER_VERSION")]
    pub runner_version: Option<String>,

    /// Login to create; used only together with `SSH_PUBLIC_KEY`.
    #[arg(long, env = "USER")]
    pub user: Option<String>,

    /// Key authorized for `USER`.
    #[arg(long, env = "SSH_PUBLIC_KEY")]
    pub ssh_public_key: Option<String>,

    /// Label of the runner to stop.
    #[arg(long, env = "LABEL")]
    pub label: Option<String>,

    /// Instance to stop.
    #[arg(long, env = "INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// Lifetime recorded in the `expires` label, e.g. `2h`.
    #[arg(long, env = "TTL")]
    pub ttl: Option<String>,
}

/// Validated parameters of `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams {
    pub registration_token: String,
    pub folder_id: String,
    pub image_id: String,
    pub subnet_id: String,
    pub zone_id: String,
    pub public_ip: bool,
    pub platform_id: String,
    pub resources: ResourcesSpec,
    pub disk_type: String,
    pub disk_size: i64,
    pub secondary_disk: Option<DiskSpec>,
    pub service_account_id: Option<String>,
    pub runner_home_dir: Option<String>,
    pub runner_version: Option<String>,
    pub user: Option<String>,
    pub ssh_public_key: Option<String>,
    pub ttl: Option<Duration>,
}

/// Validated parameters of `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopParams {
    pub label: String,
    pub instance_id: String,
}

/// Validated inputs for one of the modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerCommand {
    Start(Box<StartParams>),
    Stop(StopParams),
}

fn owned(value: Option<&String>) -> Option<String> {
    optional(value).map(ToString::to_string)
}

impl RunnerArgs {
    /// Validate the inputs for the selected mode.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] for missing or malformed inputs.
    pub fn parse(&self) -> Result<RunnerCommand, InputError> {
        let mode: Mode = required(self.mode.as_ref(), "MODE")?.parse()?;
        let github_token = required(self.github_token.as_ref(), "GITHUB_TOKEN")?;

        match mode {
            Mode::Start => self.parse_start(github_token).map(|p| RunnerCommand::Start(Box::new(p))),
            Mode::Stop => Ok(RunnerCommand::Stop(StopParams {
                label: required(self.label.as_ref(), "LABEL")?.to_string(),
                instance_id: required(self.instance_id.as_ref(), "INSTANCE_ID")?.to_string(),
            })),
        }
    }

    fn parse_start(&self, github_token: &str) -> Result<StartParams, InputError> {
        let image_id = required(self.image_id.as_ref(), "IMAGE_ID")?;
        let subnet_id = required(self.subnet_id.as_ref(), "SUBNET_ID")?;
        let folder_id = required(self.folder_id.as_ref(), "FOLDER_ID")?;

        let disk2_size = parse_memory(&self.disk2_size)?;
        let secondary_disk = if disk2_size > 0 {
            let image_id = optional(self.image2_id.as_ref()).ok_or_else(|| {
                InputError::Conflict("secondary disk image id is missing".to_string())
            })?;
            Some(DiskSpec {
                type_id: self.disk2_type.clone(),
                size: disk2_size,
                image_id: image_id.to_string(),
            })
        } else {
            None
        };

        let ttl = optional(self.ttl.as_ref()).map(parse_ttl).transpose()?;

        Ok(StartParams {
            registration_token: optional(self.pat_token.as_ref())
                .unwrap_or(github_token)
                .to_string(),
            folder_id: folder_id.to_string(),
            image_id: image_id.to_string(),
            subnet_id: subnet_id.to_string(),
            zone_id: self.zone_id.clone(),
            public_ip: self.public_ip,
            platform_id: self.platform_id.clone(),
            resources: ResourcesSpec {
                memory: parse_memory(&self.memory)?,
                cores: self.cores,
                core_fraction: self.core_fraction,
            },
            disk_type: self.disk_type.clone(),
            disk_size: parse_memory(&self.disk_size)?,
            secondary_disk,
            service_account_id: owned(self.service_account_id.as_ref()),
            runner_home_dir: owned(self.runner_home_dir.as_ref()),
            runner_version: owned(self.runner_version.as_ref()),
            user: owned(self.user.as_ref()),
            ssh_public_key: owned(self.ssh_public_key.as_ref()),
            ttl,
        })
    }
}

/// Random 5 character hex label.
#[must_use]
pub fn generate_label() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..0x10_0000);
    format!("{value:05x}")
}

impl StartParams {
    /// Labels of the new VM.
    #[must_use]
    pub fn labels(&self, now_unix: i64) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        if let Some(ttl) = self.ttl {
            let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            labels.insert(EXPIRES_LABEL.to_string(), now_unix.saturating_add(ttl).to_string());
        }
        labels
    }

    /// Create request of the runner VM.
    #[must_use]
    pub fn create_request(&self, ctx: &RunnerContext, label: &str, now_unix: i64) -> CreateInstanceRequest {
        let user_data = build_user_data(&UserDataParams {
            registration_token: &self.registration_token,
            label,
            runner_home_dir: self.runner_home_dir.as_deref(),
            runner_version: self.runner_version.as_deref(),
            user: self.user.as_deref(),
            ssh_public_key: self.ssh_public_key.as_deref(),
        });

        CreateInstanceRequest {
            folder_id: self.folder_id.clone(),
            name: format!("runner-{label}"),
            description: format!("Runner for: {}/{}", ctx.repo_owner(), ctx.repo_name()),
            labels: self.labels(now_unix),
            zone_id: self.zone_id.clone(),
            platform_id: self.platform_id.clone(),
            resources_spec: self.resources,
            metadata: BTreeMap::from([("user-data".to_string(), user_data)]),
            boot_disk_spec: AttachedDiskSpec::read_write(DiskSpec {
                type_id: self.disk_type.clone(),
                size: self.disk_size,
                image_id: self.image_id.clone(),
            }),
            secondary_disk_specs: self
                .secondary_disk
                .iter()
                .cloned()
                .map(AttachedDiskSpec::read_write)
                .collect(),
            network_interface_specs: vec![NetworkInterfaceSpec {
                subnet_id: self.subnet_id.clone(),
                primary_v4_address_spec: PrimaryAddressSpec {
                    one_to_one_nat_spec: self.public_ip.then(|| OneToOneNatSpec::ipv4("")),
                },
            }],
            service_account_id: self.service_account_id.clone().unwrap_or_default(),
        }
    }
}

/// Result of the runner action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerOutcome {
    Started { label: String, instance_id: String },
    Stopped { instance_id: String },
}

/// Start or stop a runner VM.
///
/// # Errors
///
/// Returns error on invalid inputs or API errors.
pub async fn run(cloud: &YandexCloud, ctx: &RunnerContext, args: &RunnerArgs) -> Result<RunnerOutcome> {
    let command = {
        let _group = group("Parsing Action Inputs");
        args.parse().context("Failed to parse runner inputs")?
    };

    match command {
        RunnerCommand::Start(params) => start(cloud, ctx, &params).await,
        RunnerCommand::Stop(params) => stop(cloud, &params).await,
    }
}

async fn start(cloud: &YandexCloud, ctx: &RunnerContext, params: &StartParams) -> Result<RunnerOutcome> {
    let label = generate_label();

    let instance = {
        let _group = group("Create VM");
        let request = params.create_request(ctx, &label, Utc::now().timestamp());
        cloud
            .create_instance(&request)
            .await
            .context("Failed to create VM")?
    };
    info!(instance_id = %instance.id, label = %label, "Created runner instance");

    let outputs = ctx.outputs();
    outputs.set("LABEL", &label);
    outputs.set("INSTANCE_ID", &instance.id);

    Ok(RunnerOutcome::Started {
        label,
        instance_id: instance.id,
    })
}

async fn stop(cloud: &YandexCloud, params: &StopParams) -> Result<RunnerOutcome> {
    let _group = group("Destroy VM");
    cloud
        .delete_instance(&params.instance_id)
        .await
        .context("Failed to destroy VM")?;
    info!(instance_id = %params.instance_id, label = %params.label, "Destroyed runner instance");

    Ok(RunnerOutcome::Stopped {
        instance_id: params.instance_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_args() -> RunnerArgs {
        RunnerArgs {
            mode: Some("start".into()),
            github_token: Some("gh-token".into()),
            folder_id: Some("b1g".into()),
            image_id: Some("fd8img".into()),
            subnet_id: Some("e9b1".into()),
            zone_id: "ru-central1-a".into(),
            platform_id: "standard-v3".into(),
            cores: 2,
            memory: "1Gb".into(),
            core_fraction: 100,
            disk_type: "network-ssd".into(),
            disk_size: "30Gb".into(),
            disk2_type: "network-ssd".into(),
            disk2_size: "0Gb".into(),
            ..Default::default()
        }
    }

    fn start_params(args: &RunnerArgs) -> StartParams {
        match args.parse().unwrap() {
            RunnerCommand::Start(params) => *params,
            RunnerCommand::Stop(_) => panic!("expected start"),
        }
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("start".parse::<Mode>().unwrap(), Mode::Start);
        assert_eq!(" stop ".parse::<Mode>().unwrap(), Mode::Stop);
        assert_eq!(
            "restart".parse::<Mode>().unwrap_err().to_string(),
            "wrong mode 'restart'. Allowed values: start, stop"
        );
    }

    #[test]
    fn test_parse_start() {
        let params = start_params(&start_args());
        assert_eq!(params.registration_token, "gh-token");
        assert_eq!(params.resources.memory, 1024 * 1024 * 1024);
        assert_eq!(params.secondary_disk, None);
        assert_eq!(params.ttl, None);
    }

    #[test]
    fn test_pat_token_wins() {
        let params = start_params(&RunnerArgs {
            pat_token: Some("pat".into()),
            ..start_args()
        });
        assert_eq!(params.registration_token, "pat");
    }

    #[test]
    fn test_parse_requires_token_and_mode() {
        let args = RunnerArgs { github_token: None, ..start_args() };
        assert_eq!(args.parse().unwrap_err(), InputError::Missing("GITHUB_TOKEN"));

        let args = RunnerArgs { mode: None, ..start_args() };
        assert_eq!(args.parse().unwrap_err(), InputError::Missing("MODE"));
    }

    #[test]
    fn test_start_requires_image_subnet_folder() {
        let cases = [
            (RunnerArgs { image_id: None, ..start_args() }, "IMAGE_ID"),
            (RunnerArgs { subnet_id: None, ..start_args() }, "SUBNET_ID"),
            (RunnerArgs { folder_id: None, ..start_args() }, "FOLDER_ID"),
        ];
        for (args, input) in cases {
            assert_eq!(args.parse().unwrap_err(), InputError::Missing(input));
        }
    }

    #[test]
    fn test_secondary_disk() {
        let args = RunnerArgs {
            disk2_size: "30Gb".into(),
            ..start_args()
        };
        assert_eq!(
            args.parse().unwrap_err().to_string(),
            "secondary disk image id is missing"
        );

        let params = start_params(&RunnerArgs {
            image2_id: Some("fd8data".into()),
            ..args
        });
        let disk = params.secondary_disk.unwrap();
        assert_eq!(disk.image_id, "fd8data");
        assert_eq!(disk.size, 30 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_stop() {
        let args = RunnerArgs {
            mode: Some("stop".into()),
            github_token: Some("gh-token".into()),
            label: Some("a1b2c".into()),
            instance_id: Some("fhm1".into()),
            ..Default::default()
        };
        assert_eq!(
            args.parse().unwrap(),
            RunnerCommand::Stop(StopParams {
                label: "a1b2c".into(),
                instance_id: "fhm1".into(),
            })
        );

        let without_label = RunnerArgs { label: None, ..args };
        assert_eq!(without_label.parse().unwrap_err(), InputError::Missing("LABEL"));
    }

    #[test]
    fn test_generate_label() {
        let label = generate_label();
        assert_eq!(label.len(), 5);
        assert!(label.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_expires_label() {
        let params = start_params(&RunnerArgs {
            ttl: Some("2h".into()),
            ..start_args()
        });
        let labels = params.labels(1_700_000_000);
        assert_eq!(labels[EXPIRES_LABEL], "1700007200");

        assert!(start_params(&start_args()).labels(1_700_000_000).is_empty());
    }

    #[test]
    fn test_create_request() {
        let mut ctx = RunnerContext::new(".");
        ctx.repo_url = Some("https://git.example.com/acme/site.git".into());

        let params = start_params(&start_args());
        let request = params.create_request(&ctx, "a1b2c", 0);
        assert_eq!(request.name, "runner-a1b2c");
        assert_eq!(request.description, "Runner for: acme/site");
        assert!(request.metadata["user-data"].contains("--tags a1b2c"));
        assert!(request.secondary_disk_specs.is_empty());
        assert_eq!(
            request.network_interface_specs[0].primary_v4_address_spec.one_to_one_nat_spec,
            None
        );

        let public = StartParams {
            public_ip: true,
            ..params
        };
        let request = public.create_request(&ctx, "a1b2c", 0);
        assert_eq!(
            request.network_interface_specs[0].primary_v4_address_spec.one_to_one_nat_spec,
            Some(OneToOneNatSpec::ipv4(""))
        );
    }
}

//! Deploy a docker-compose application to a VM running Container Optimized
//! Image.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;
use yc_cloud::compute::{
    AttachedDiskSpec, CreateInstanceRequest, DiskSpec, Instance, InstanceView,
    NetworkInterfaceSpec, OneToOneNatSpec, PrimaryAddressSpec, ResourcesSpec,
    STANDARD_IMAGES_FOLDER,
};
use yc_cloud::YandexCloud;

use crate::error::InputError;
use crate::inputs::{optional, parse_memory, render_env_template, required};
use crate::workflow::{group, Outputs, RunnerContext};

/// Image family of Container Optimized Image.
pub const COI_IMAGE_FAMILY: &str = "container-optimized-image";

/// Metadata keys managed by this action.
pub const USER_DATA_KEY: &str = "user-data";
pub const DOCKER_COMPOSE_KEY: &str = "docker-compose";
pub const SHA_KEY: &str = "sourcecraft-sha";

/// Key of single-container VMs; incompatible with `docker-compose`.
pub const DOCKER_CONTAINER_DECLARATION_KEY: &str = "docker-container-declaration";

/// Inputs of the COI action.
#[derive(Args, Debug, Clone, Default)]
pub struct CoiArgs {
    /// Folder holding the VM.
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// cloud-init user data file, relative to the workspace.
    #[arg(long, env = "USER_DATA_PATH")]
    pub user_data_path: Option<String>,

    /// docker-compose file, relative to the workspace.
    #[arg(long, env = "DOCKER_COMPOSE_PATH")]
    pub docker_compose_path: Option<String>,

    /// VM name; created when missing.
    #[arg(long, env = "VM_NAME")]
    pub vm_name: Option<String>,

    /// Service account attached to the VM.
    #[arg(long, env = "VM_SERVICE_ACCOUNT_ID")]
    pub vm_service_account_id: Option<String>,

    /// Name of that service account.
    #[arg(long, env = "VM_SERVICE_ACCOUNT_NAME")]
    pub vm_service_account_name: Option<String>,

    /// Availability zone.
    #[arg(long, env = "VM_ZONE_ID", default_value = "ru-central1-a")]
    pub vm_zone_id: String,

    /// Subnet of the network interface.
    #[arg(long, env = "VM_SUBNET_ID")]
    pub vm_subnet_id: Option<String>,

    /// Reserved public address.
    #[arg(long, env = "VM_PUBLIC_IP")]
    pub vm_public_ip: Option<String>,

    /// Hardware platform.
    #[arg(long, env = "VM_PLATFORM_ID", default_value = "standard-v3")]
    pub vm_platform_id: String,

    /// CPU cores.
    #[arg(long, env = "VM_CORES", default_value_t = 2)]
    pub vm_cores: i64,

    /// Memory.
    #[arg(long, env = "VM_MEMORY", default_value = "2Gb")]
    pub vm_memory: String,

    /// Boot disk type.
    #[arg(long, env = "VM_DISK_TYPE", default_value = "network-ssd")]
    pub vm_disk_type: String,

    /// Boot disk size.
    #[arg(long, env = "VM_DISK_SIZE", default_value = "30Gb")]
    pub vm_disk_size: String,

    /// Guaranteed CPU share, percent.
    #[arg(long, env = "VM_CORE_FRACTION", default_value_t = 100)]
    pub vm_core_fraction: i64,
}

/// Validated VM parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmParams {
    pub folder_id: String,
    pub name: String,
    pub user_data_path: String,
    pub docker_compose_path: String,
    pub service_account_id: Option<String>,
    pub service_account_name: Option<String>,
    pub zone_id: String,
    pub subnet_id: String,
    pub public_ip: Option<String>,
    pub platform_id: String,
    pub resources: ResourcesSpec,
    pub disk_type: String,
    pub disk_size: i64,
}

impl CoiArgs {
    /// Validate the inputs.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] for missing or malformed inputs.
    pub fn parse(&self) -> Result<VmParams, InputError> {
        let folder_id = required(self.folder_id.as_ref(), "FOLDER_ID")?;
        let user_data_path = required(self.user_data_path.as_ref(), "USER_DATA_PATH")?;
        let docker_compose_path = required(self.docker_compose_path.as_ref(), "DOCKER_COMPOSE_PATH")?;
        let name = required(self.vm_name.as_ref(), "VM_NAME")?;

        let service_account_id = optional(self.vm_service_account_id.as_ref());
        let service_account_name = optional(self.vm_service_account_name.as_ref());
        if service_account_id.is_none() && service_account_name.is_none() {
            return Err(InputError::Conflict(
                "either VM_SERVICE_ACCOUNT_ID or VM_SERVICE_ACCOUNT_NAME should be provided"
                    .to_string(),
            ));
        }

        let subnet_id = required(self.vm_subnet_id.as_ref(), "VM_SUBNET_ID")?;

        Ok(VmParams {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
            user_data_path: user_data_path.to_string(),
            docker_compose_path: docker_compose_path.to_string(),
            service_account_id: service_account_id.map(ToString::to_string),
            service_account_name: service_account_name.map(ToString::to_string),
            zone_id: self.vm_zone_id.clone(),
            subnet_id: subnet_id.to_string(),
            public_ip: optional(self.vm_public_ip.as_ref()).map(ToString::to_string),
            platform_id: self.vm_platform_id.clone(),
            resources: ResourcesSpec {
                memory: parse_memory(&self.vm_memory)?,
                cores: self.vm_cores,
                core_fraction: self.vm_core_fraction,
            },
            disk_type: self.vm_disk_type.clone(),
            disk_size: parse_memory(&self.vm_disk_size)?,
        })
    }
}

impl VmParams {
    /// Metadata carrying the rendered configs and the commit.
    ///
    /// # Errors
    ///
    /// Returns error if a config file cannot be read.
    pub fn metadata(
        &self,
        ctx: &RunnerContext,
        env: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let render = |path: &str| -> Result<String> {
            let full = ctx.resolve(path);
            let content = std::fs::read_to_string(&full)
                .with_context(|| format!("failed to read file {}", full.display()))?;
            Ok(render_env_template(&content, env))
        };

        Ok(BTreeMap::from([
            (
                USER_DATA_KEY.to_string(),
                render(&self.user_data_path).context("failed to prepare user data")?,
            ),
            (
                DOCKER_COMPOSE_KEY.to_string(),
                render(&self.docker_compose_path).context("failed to prepare docker compose")?,
            ),
            (
                SHA_KEY.to_string(),
                ctx.commit_sha.clone().unwrap_or_default(),
            ),
        ]))
    }

    /// Create request booting from `image_id`.
    #[must_use]
    pub fn create_request(
        &self,
        image_id: &str,
        service_account_id: &str,
        description: String,
        metadata: BTreeMap<String, String>,
    ) -> CreateInstanceRequest {
        CreateInstanceRequest {
            folder_id: self.folder_id.clone(),
            name: self.name.clone(),
            description,
            labels: BTreeMap::new(),
            zone_id: self.zone_id.clone(),
            platform_id: self.platform_id.clone(),
            resources_spec: self.resources,
            metadata,
            boot_disk_spec: AttachedDiskSpec::read_write(DiskSpec {
                type_id: self.disk_type.clone(),
                size: self.disk_size,
                image_id: image_id.to_string(),
            }),
            secondary_disk_specs: Vec::new(),
            network_interface_specs: vec![NetworkInterfaceSpec {
                subnet_id: self.subnet_id.clone(),
                primary_v4_address_spec: PrimaryAddressSpec {
                    one_to_one_nat_spec: Some(OneToOneNatSpec::ipv4(
                        self.public_ip.clone().unwrap_or_default(),
                    )),
                },
            }],
            service_account_id: service_account_id.to_string(),
        }
    }
}

/// Result of the COI action.
#[derive(Debug, Clone)]
pub struct CoiDeployment {
    /// The VM after the change.
    pub instance: Instance,
    /// Whether the VM was created by this run.
    pub created: bool,
}

/// Create the VM or update the configs of the existing one.
///
/// # Errors
///
/// Returns error on invalid inputs, a conflicting VM or API errors.
pub async fn run(cloud: &YandexCloud, ctx: &RunnerContext, args: &CoiArgs) -> Result<CoiDeployment> {
    let params = {
        let _group = group("Parsing Action Inputs");
        args.parse().context("Failed to parse VM inputs")?
    };
    info!(folder_id = %params.folder_id, name = %params.name, "VM inputs parsed");

    let service_account_id = cloud
        .resolve_service_account_id(
            &params.folder_id,
            params.service_account_id.as_deref(),
            params.service_account_name.as_deref(),
        )
        .await
        .context("Failed to resolve service account")?
        .unwrap_or_default();

    let env: HashMap<String, String> = std::env::vars().collect();
    let metadata = params.metadata(ctx, &env)?;
    let outputs = ctx.outputs();

    let existing = cloud
        .find_instance_by_name(&params.folder_id, &params.name)
        .await
        .context("Failed to find VM")?;

    let deployment = match existing {
        None => {
            let _group = group("Create new VM");
            let image = cloud
                .latest_image_by_family(STANDARD_IMAGES_FOLDER, COI_IMAGE_FAMILY)
                .await
                .context("Failed to find Container Optimized Image")?;
            info!(image_id = %image.id, "Using Container Optimized Image");

            let request =
                params.create_request(&image.id, &service_account_id, ctx.created_from(), metadata);
            let instance = cloud
                .create_instance(&request)
                .await
                .context("Failed to create VM")?;
            info!(instance_id = %instance.id, "Created instance");
            CoiDeployment {
                instance,
                created: true,
            }
        }
        Some(instance) => {
            {
                let _group = group("Check metadata");
                let full = cloud
                    .get_instance(&instance.id, InstanceView::Full)
                    .await
                    .context("Failed to get instance")?;
                detect_metadata_conflict(&full)?;
            }

            let _group = group("Update metadata");
            cloud
                .update_instance_metadata(&instance.id, metadata)
                .await
                .context("Failed to update VM metadata")?;
            let instance = cloud
                .get_instance(&instance.id, InstanceView::Basic)
                .await
                .context("Failed to get instance")?;
            info!(instance_id = %instance.id, "Updated instance");
            CoiDeployment {
                instance,
                created: false,
            }
        }
    };

    set_outputs(&outputs, &deployment);
    Ok(deployment)
}

/// Refuse VMs declared with a single container spec.
///
/// # Errors
///
/// Returns error when the VM metadata has `docker-container-declaration`.
pub fn detect_metadata_conflict(instance: &Instance) -> Result<()> {
    if instance.metadata.contains_key(DOCKER_CONTAINER_DECLARATION_KEY) {
        bail!(
            "Metadata conflict detected: provided VM was created with '{DOCKER_CONTAINER_DECLARATION_KEY}' metadata key. \
             It will conflict with '{DOCKER_COMPOSE_KEY}' key this action using. \
             Either recreate VM using docker-compose as container definition \
             or let the action create the new one by dropping 'name' parameter"
        );
    }
    Ok(())
}

fn set_outputs(outputs: &Outputs, deployment: &CoiDeployment) {
    let instance = &deployment.instance;
    outputs.set("created", if deployment.created { "true" } else { "false" });
    outputs.set("INSTANCE_ID", &instance.id);
    if let Some(disk_id) = instance.boot_disk_id() {
        outputs.set("DISK_ID", disk_id);
    }
    if let Some(ip) = instance.public_ip() {
        outputs.set("PUBLIC_IP", ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> CoiArgs {
        CoiArgs {
            folder_id: Some("b1g".into()),
            user_data_path: Some("user-data.yaml".into()),
            docker_compose_path: Some("docker-compose.yaml".into()),
            vm_name: Some("web".into()),
            vm_service_account_id: Some("aje1".into()),
            vm_subnet_id: Some("e9b1".into()),
            vm_zone_id: "ru-central1-a".into(),
            vm_platform_id: "standard-v3".into(),
            vm_cores: 2,
            vm_memory: "2Gb".into(),
            vm_disk_type: "network-ssd".into(),
            vm_disk_size: "30Gb".into(),
            vm_core_fraction: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_defaults() {
        let params = args().parse().unwrap();
        assert_eq!(params.resources.memory, 2 * 1024 * 1024 * 1024);
        assert_eq!(params.disk_size, 30 * 1024 * 1024 * 1024);
        assert_eq!(params.public_ip, None);
    }

    #[test]
    fn test_parse_requires_service_account() {
        let no_account = CoiArgs {
            vm_service_account_id: None,
            ..args()
        };
        assert!(matches!(
            no_account.parse().unwrap_err(),
            InputError::Conflict(_)
        ));

        let by_name = CoiArgs {
            vm_service_account_id: None,
            vm_service_account_name: Some("deployer".into()),
            ..args()
        };
        assert!(by_name.parse().is_ok());
    }

    #[test]
    fn test_parse_required_inputs() {
        let cases = [
            (CoiArgs { folder_id: None, ..args() }, "FOLDER_ID"),
            (CoiArgs { user_data_path: None, ..args() }, "USER_DATA_PATH"),
            (CoiArgs { docker_compose_path: None, ..args() }, "DOCKER_COMPOSE_PATH"),
            (CoiArgs { vm_name: None, ..args() }, "VM_NAME"),
            (CoiArgs { vm_subnet_id: None, ..args() }, "VM_SUBNET_ID"),
        ];
        for (args, input) in cases {
            assert_eq!(args.parse().unwrap_err(), InputError::Missing(input));
        }
    }

    #[test]
    fn test_metadata_renders_env_placeholders() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("user-data.yaml"), "#cloud-config\nusers: []\n").unwrap();
        std::fs::write(
            dir.path().join("docker-compose.yaml"),
            "services:\n  app:\n    image: {{env.IMAGE}}\n",
        )
        .unwrap();

        let mut ctx = RunnerContext::new(dir.path());
        ctx.commit_sha = Some("4f2a".into());
        let env = HashMap::from([("IMAGE".to_string(), "cr.yandex/crp/app:1".to_string())]);

        let metadata = args().parse().unwrap().metadata(&ctx, &env).unwrap();
        assert_eq!(metadata[USER_DATA_KEY], "#cloud-config\nusers: []\n");
        assert_eq!(
            metadata[DOCKER_COMPOSE_KEY],
            "services:\n  app:\n    image: cr.yandex/crp/app:1\n"
        );
        assert_eq!(metadata[SHA_KEY], "4f2a");
    }

    #[test]
    fn test_metadata_missing_file() {
        let dir = TempDir::new().unwrap();
        let ctx = RunnerContext::new(dir.path());
        let err = args().parse().unwrap().metadata(&ctx, &HashMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "failed to prepare user data");
    }

    #[test]
    fn test_create_request_always_has_nat() {
        let params = args().parse().unwrap();
        let request = params.create_request("fd8coi", "aje1", "Created from: acme/site".into(), BTreeMap::new());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["bootDiskSpec"]["diskSpec"]["imageId"], "fd8coi");
        assert_eq!(json["bootDiskSpec"]["diskSpec"]["size"], "32212254720");
        assert_eq!(
            json["networkInterfaceSpecs"][0]["primaryV4AddressSpec"]["oneToOneNatSpec"],
            serde_json::json!({"ipVersion": "IPV4"})
        );

        let with_ip = VmParams {
            public_ip: Some("51.250.1.2".into()),
            ..params
        };
        let json = serde_json::to_value(with_ip.create_request("fd8coi", "aje1", String::new(), BTreeMap::new())).unwrap();
        assert_eq!(
            json["networkInterfaceSpecs"][0]["primaryV4AddressSpec"]["oneToOneNatSpec"]["address"],
            "51.250.1.2"
        );
    }

    #[test]
    fn test_detect_metadata_conflict() {
        let mut instance = Instance::default();
        assert!(detect_metadata_conflict(&instance).is_ok());

        instance
            .metadata
            .insert(DOCKER_CONTAINER_DECLARATION_KEY.into(), "spec: {}".into());
        let err = detect_metadata_conflict(&instance).unwrap_err();
        assert!(err.to_string().contains("docker-container-declaration"));
    }
}

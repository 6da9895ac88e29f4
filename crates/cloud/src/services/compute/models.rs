//! Compute Cloud request and response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::int64;

// ============================================================================
// Instances
// ============================================================================

/// Virtual machine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance ID.
    pub id: String,
    /// Folder ID.
    #[serde(default)]
    pub folder_id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Status, e.g. `RUNNING`.
    #[serde(default)]
    pub status: String,
    /// Metadata; only returned with the `FULL` view.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Boot disk.
    #[serde(default)]
    pub boot_disk: Option<AttachedDisk>,
    /// Network interfaces.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

impl Instance {
    /// ID of the boot disk.
    #[must_use]
    pub fn boot_disk_id(&self) -> Option<&str> {
        self.boot_disk.as_ref().map(|disk| disk.disk_id.as_str())
    }

    /// Public IPv4 address of the first interface.
    #[must_use]
    pub fn public_ip(&self) -> Option<&str> {
        self.network_interfaces
            .first()
            .and_then(|nic| nic.primary_v4_address.as_ref())
            .and_then(|address| address.one_to_one_nat.as_ref())
            .map(|nat| nat.address.as_str())
            .filter(|address| !address.is_empty())
    }
}

/// Disk attached to an instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Disk ID.
    #[serde(default)]
    pub disk_id: String,
    /// Deleted together with the instance.
    #[serde(default)]
    pub auto_delete: bool,
}

/// Network interface of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Subnet ID.
    #[serde(default)]
    pub subnet_id: String,
    /// Primary IPv4 address.
    #[serde(default)]
    pub primary_v4_address: Option<PrimaryAddress>,
}

/// Address assigned to an interface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAddress {
    /// Internal address.
    #[serde(default)]
    pub address: String,
    /// One-to-one NAT.
    #[serde(default)]
    pub one_to_one_nat: Option<OneToOneNat>,
}

/// Public address bound to an interface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneNat {
    /// Public address.
    #[serde(default)]
    pub address: String,
}

/// List instances response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesResponse {
    /// Instances.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Amount of instance detail returned by `get`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstanceView {
    /// Without metadata.
    #[default]
    Basic,
    /// Including metadata.
    Full,
}

impl InstanceView {
    /// Query value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "BASIC",
            Self::Full => "FULL",
        }
    }
}

// ============================================================================
// Create instance
// ============================================================================

/// Compute resources of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
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

/// New disk created from an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    /// Disk type, e.g. `network-ssd`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub type_id: String,
    /// Size in bytes.
    #[serde(with = "int64")]
    pub size: i64,
    /// Source image.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_id: String,
}

/// Disk to attach on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskSpec {
    /// Access mode.
    pub mode: String,
    /// Delete together with the instance.
    pub auto_delete: bool,
    /// Disk to create.
    pub disk_spec: DiskSpec,
}

impl AttachedDiskSpec {
    /// Read-write disk deleted together with the instance.
    #[must_use]
    pub fn read_write(disk_spec: DiskSpec) -> Self {
        Self {
            mode: "READ_WRITE".to_string(),
            auto_delete: true,
            disk_spec,
        }
    }
}

/// Public address request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneToOneNatSpec {
    /// IP version.
    pub ip_version: String,
    /// Reserved address to use.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
}

impl OneToOneNatSpec {
    /// IPv4 NAT, optionally with a reserved address.
    #[must_use]
    pub fn ipv4(address: impl Into<String>) -> Self {
        Self {
            ip_version: "IPV4".to_string(),
            address: address.into(),
        }
    }
}

/// Primary address of a new interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAddressSpec {
    /// Public address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_to_one_nat_spec: Option<OneToOneNatSpec>,
}

/// Network interface of a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceSpec {
    /// Subnet ID.
    pub subnet_id: String,
    /// Primary IPv4 address.
    pub primary_v4_address_spec: PrimaryAddressSpec,
}

/// Create instance request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    /// Folder ID.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Availability zone.
    pub zone_id: String,
    /// Hardware platform.
    pub platform_id: String,
    /// Compute resources.
    pub resources_spec: ResourcesSpec,
    /// Metadata, e.g. `user-data`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Boot disk.
    pub boot_disk_spec: AttachedDiskSpec,
    /// Additional disks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary_disk_specs: Vec<AttachedDiskSpec>,
    /// Network interfaces.
    pub network_interface_specs: Vec<NetworkInterfaceSpec>,
    /// Service account of the instance.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_account_id: String,
}

/// Metadata of instance operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMetadata {
    /// Instance ID.
    pub instance_id: String,
}

/// Update instance metadata request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateInstanceMetadataRequest {
    /// Keys to remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
    /// Keys to add or replace.
    pub upsert: BTreeMap<String, String>,
}

// ============================================================================
// Images
// ============================================================================

/// Disk image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image ID.
    pub id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Family.
    #[serde(default)]
    pub family: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_accessors() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "id": "fhm1",
                "bootDisk": {"diskId": "fhm-disk", "autoDelete": true},
                "networkInterfaces": [{
                    "subnetId": "e9b1",
                    "primaryV4Address": {
                        "address": "10.0.0.5",
                        "oneToOneNat": {"address": "51.250.1.2", "ipVersion": "IPV4"}
                    }
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(instance.boot_disk_id(), Some("fhm-disk"));
        assert_eq!(instance.public_ip(), Some("51.250.1.2"));
        assert!(instance.metadata.is_empty());
    }

    #[test]
    fn test_instance_without_nat() {
        let instance: Instance = serde_json::from_str(
            r#"{"id": "fhm2", "networkInterfaces": [{"primaryV4Address": {"address": "10.0.0.6"}}]}"#,
        )
        .unwrap();
        assert_eq!(instance.public_ip(), None);
        assert_eq!(instance.boot_disk_id(), None);
    }

    #[test]
    fn test_disk_spec_wire_format() {
        let spec = AttachedDiskSpec::read_write(DiskSpec {
            type_id: "network-ssd".into(),
            size: 32_212_254_720,
            image_id: "fd8".into(),
        });
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({
                "mode": "READ_WRITE",
                "autoDelete": true,
                "diskSpec": {"typeId": "network-ssd", "size": "32212254720", "imageId": "fd8"}
            })
        );
    }
}

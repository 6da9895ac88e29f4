//! Compute Cloud API calls.

use std::collections::BTreeMap;

use tracing::info;

use super::models::{
    CreateInstanceRequest, Image, Instance, InstanceMetadata, InstanceView, ListInstancesResponse,
    UpdateInstanceMetadataRequest,
};
use crate::client::YandexCloud;
use crate::error::CloudError;
use crate::operation::Operation;
use crate::services::name_filter;

impl YandexCloud {
    fn compute_url(&self, path: &str) -> String {
        format!("{}/compute/v1/{path}", self.endpoints.compute)
    }

    /// Find an instance of a folder by exact name.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn find_instance_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<Instance>, CloudError> {
        let response: ListInstancesResponse = self
            .get(
                &self.compute_url("instances"),
                &[("folderId", folder_id), ("filter", &name_filter(name))],
            )
            .await?;

        Ok(response.instances.into_iter().next())
    }

    /// Get an instance by ID.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_instance(
        &self,
        instance_id: &str,
        view: InstanceView,
    ) -> Result<Instance, CloudError> {
        self.get(
            &self.compute_url(&format!("instances/{instance_id}")),
            &[("view", view.as_str())],
        )
        .await
    }

    /// Create an instance and wait until it is provisioned.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Instance, CloudError> {
        info!(
            folder_id = %request.folder_id,
            name = %request.name,
            zone = %request.zone_id,
            "Creating instance"
        );

        let operation: Operation = self.post(&self.compute_url("instances"), request).await?;
        let operation = self.wait_operation(operation).await?;

        let instance = match operation.response_as::<Instance>() {
            Ok(instance) => instance,
            Err(_) => {
                let metadata: InstanceMetadata = operation.metadata_as()?;
                self.get_instance(&metadata.instance_id, InstanceView::Basic)
                    .await?
            }
        };

        info!(instance_id = %instance.id, "Instance created");
        Ok(instance)
    }

    /// Add or replace metadata keys of an instance and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn update_instance_metadata(
        &self,
        instance_id: &str,
        upsert: BTreeMap<String, String>,
    ) -> Result<(), CloudError> {
        info!(instance_id = %instance_id, keys = upsert.len(), "Updating instance metadata");

        let request = UpdateInstanceMetadataRequest {
            delete: Vec::new(),
            upsert,
        };
        let operation: Operation = self
            .post(
                &self.compute_url(&format!("instances/{instance_id}/updateMetadata")),
                &request,
            )
            .await?;
        self.wait_operation(operation).await?;

        Ok(())
    }

    /// Delete an instance and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn delete_instance(&self, instance_id: &str) -> Result<(), CloudError> {
        info!(instance_id = %instance_id, "Deleting instance");

        let operation: Operation = self
            .delete(&self.compute_url(&format!("instances/{instance_id}")))
            .await?;
        self.wait_operation(operation).await?;

        info!(instance_id = %instance_id, "Instance deleted");
        Ok(())
    }

    /// Latest image of a family.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn latest_image_by_family(
        &self,
        folder_id: &str,
        family: &str,
    ) -> Result<Image, CloudError> {
        let image: Image = self
            .get(
                &self.compute_url("images:latestByFamily"),
                &[("folderId", folder_id), ("family", family)],
            )
            .await?;

        info!(image_id = %image.id, family = %family, "Found latest image");
        Ok(image)
    }
}

//! Serverless Containers API calls.

use tracing::info;

use super::models::{
    Container, CreateContainerMetadata, CreateContainerRequest, DeployContainerRevisionMetadata,
    DeployRevisionRequest, ListContainersResponse, Revision, SetAccessBindingsRequest,
};
use crate::client::YandexCloud;
use crate::error::CloudError;
use crate::models::AccessBinding;
use crate::operation::Operation;
use crate::services::name_filter;

impl YandexCloud {
    fn containers_url(&self, path: &str) -> String {
        format!("{}/containers/v1/{path}", self.endpoints.containers)
    }

    /// Find a container of a folder by exact name.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn find_container_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<Container>, CloudError> {
        let response: ListContainersResponse = self
            .get(
                &self.containers_url("containers"),
                &[("folderId", folder_id), ("filter", &name_filter(name))],
            )
            .await?;

        Ok(response.containers.into_iter().next())
    }

    /// Create a container and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn create_container(
        &self,
        request: &CreateContainerRequest,
    ) -> Result<String, CloudError> {
        info!(folder_id = %request.folder_id, name = %request.name, "Creating container");

        let operation: Operation = self.post(&self.containers_url("containers"), request).await?;
        let operation = self.wait_operation(operation).await?;
        let metadata: CreateContainerMetadata = operation.metadata_as()?;

        info!(container_id = %metadata.container_id, "Container created");
        Ok(metadata.container_id)
    }

    /// Deploy a new revision and wait for it.
    ///
    /// The revision is read from the operation response when present and
    /// otherwise assembled from the operation metadata.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn deploy_revision(
        &self,
        request: &DeployRevisionRequest,
    ) -> Result<Revision, CloudError> {
        info!(
            container_id = %request.container_id,
            image = %request.image_spec.image_url,
            "Deploying container revision"
        );

        let operation: Operation = self
            .post(&self.containers_url("revisions:deploy"), request)
            .await?;
        let operation = self.wait_operation(operation).await?;

        let revision = match operation.response_as::<Revision>() {
            Ok(revision) => revision,
            Err(_) => {
                let metadata: DeployContainerRevisionMetadata = operation.metadata_as()?;
                Revision {
                    id: metadata.container_revision_id,
                    container_id: request.container_id.clone(),
                    status: String::new(),
                }
            }
        };

        info!(revision_id = %revision.id, "Container revision deployed");
        Ok(revision)
    }

    /// Replace the access bindings of a container and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn set_container_access_bindings(
        &self,
        container_id: &str,
        access_bindings: Vec<AccessBinding>,
    ) -> Result<(), CloudError> {
        info!(container_id = %container_id, bindings = access_bindings.len(), "Setting access bindings");

        let url = self.containers_url(&format!("containers/{container_id}:setAccessBindings"));
        let operation: Operation = self
            .post(&url, &SetAccessBindingsRequest { access_bindings })
            .await?;
        self.wait_operation(operation).await?;

        Ok(())
    }
}

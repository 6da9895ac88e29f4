//! Cloud Functions API calls.

use tracing::info;

use super::models::{
    CreateFunctionMetadata, CreateFunctionRequest, CreateFunctionVersionMetadata,
    CreateFunctionVersionRequest, Function, ListFunctionsResponse,
};
use crate::client::YandexCloud;
use crate::error::CloudError;
use crate::operation::Operation;
use crate::services::name_filter;

impl YandexCloud {
    fn functions_url(&self, path: &str) -> String {
        format!("{}/functions/v1/{path}", self.endpoints.functions)
    }

    /// Find a function of a folder by exact name.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn find_function_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<Function>, CloudError> {
        let response: ListFunctionsResponse = self
            .get(
                &self.functions_url("functions"),
                &[("folderId", folder_id), ("filter", &name_filter(name))],
            )
            .await?;

        Ok(response.functions.into_iter().next())
    }

    /// Create a function and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<String, CloudError> {
        info!(folder_id = %request.folder_id, name = %request.name, "Creating function");

        let operation: Operation = self.post(&self.functions_url("functions"), request).await?;
        let operation = self.wait_operation(operation).await?;
        let metadata: CreateFunctionMetadata = operation.metadata_as()?;

        info!(function_id = %metadata.function_id, "Function created");
        Ok(metadata.function_id)
    }

    /// Create a function version and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn create_function_version(
        &self,
        request: &CreateFunctionVersionRequest,
    ) -> Result<String, CloudError> {
        info!(function_id = %request.function_id, runtime = %request.runtime, "Creating function version");

        let operation: Operation = self.post(&self.functions_url("versions"), request).await?;
        let operation = self.wait_operation(operation).await?;
        let metadata: CreateFunctionVersionMetadata = operation.metadata_as()?;

        info!(version_id = %metadata.function_version_id, "Function version created");
        Ok(metadata.function_version_id)
    }
}

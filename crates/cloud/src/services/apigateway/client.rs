//! API Gateway API calls.

use tracing::info;

use super::models::{
    ApiGateway, ApiGatewayMetadata, CreateApiGatewayRequest, ListApiGatewaysResponse,
    UpdateApiGatewayRequest,
};
use crate::client::YandexCloud;
use crate::error::CloudError;
use crate::operation::Operation;
use crate::services::name_filter;

impl YandexCloud {
    fn api_gateway_url(&self, path: &str) -> String {
        format!("{}/apigateways/v1/{path}", self.endpoints.api_gateway)
    }

    /// Find an API gateway of a folder by exact name.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn find_gateway_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<ApiGateway>, CloudError> {
        let response: ListApiGatewaysResponse = self
            .get(
                &self.api_gateway_url("apigateways"),
                &[("folderId", folder_id), ("filter", &name_filter(name))],
            )
            .await?;

        Ok(response.api_gateways.into_iter().next())
    }

    /// Get an API gateway by ID.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_gateway(&self, id: &str) -> Result<ApiGateway, CloudError> {
        self.get(&self.api_gateway_url(&format!("apigateways/{id}")), &[])
            .await
    }

    /// Create an API gateway and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn create_gateway(
        &self,
        request: &CreateApiGatewayRequest,
    ) -> Result<ApiGateway, CloudError> {
        info!(folder_id = %request.folder_id, name = %request.name, "Creating API gateway");

        let operation: Operation = self
            .post(&self.api_gateway_url("apigateways"), request)
            .await?;
        let operation = self.wait_operation(operation).await?;

        let gateway = match operation.response_as::<ApiGateway>() {
            Ok(gateway) => gateway,
            Err(_) => {
                let metadata: ApiGatewayMetadata = operation.metadata_as()?;
                self.get_gateway(&metadata.api_gateway_id).await?
            }
        };

        info!(gateway_id = %gateway.id, domain = %gateway.domain, "API gateway created");
        Ok(gateway)
    }

    /// Replace the `OpenAPI` specification of a gateway and wait for it.
    ///
    /// # Errors
    /// Returns error if the API call or the operation fails.
    pub async fn update_gateway_spec(&self, id: &str, spec: &str) -> Result<(), CloudError> {
        info!(gateway_id = %id, "Updating API gateway specification");

        let request = UpdateApiGatewayRequest {
            update_mask: "openapiSpec".to_string(),
            openapi_spec: spec.to_string(),
        };
        let operation: Operation = self
            .patch(&self.api_gateway_url(&format!("apigateways/{id}")), &request)
            .await?;
        self.wait_operation(operation).await?;

        Ok(())
    }
}

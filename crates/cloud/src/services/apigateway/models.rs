//! API Gateway request and response models.

use serde::{Deserialize, Serialize};

/// API gateway.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGateway {
    /// Gateway ID.
    pub id: String,
    /// Folder ID.
    #[serde(default)]
    pub folder_id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Default domain serving the gateway.
    #[serde(default)]
    pub domain: String,
    /// Status.
    #[serde(default)]
    pub status: String,
}

/// List API gateways response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiGatewaysResponse {
    /// Gateways.
    #[serde(default)]
    pub api_gateways: Vec<ApiGateway>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Create API gateway request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiGatewayRequest {
    /// Folder ID.
    pub folder_id: String,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// `OpenAPI` specification.
    pub openapi_spec: String,
}

/// Update API gateway request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiGatewayRequest {
    /// Fields to update.
    pub update_mask: String,
    /// `OpenAPI` specification.
    pub openapi_spec: String,
}

/// Metadata of create and update operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayMetadata {
    /// Gateway ID.
    pub api_gateway_id: String,
}

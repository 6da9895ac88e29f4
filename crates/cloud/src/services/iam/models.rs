//! IAM request and response models.

use serde::Deserialize;

/// Service account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Service account ID.
    pub id: String,
    /// Folder the account belongs to.
    #[serde(default)]
    pub folder_id: String,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// List service accounts response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServiceAccountsResponse {
    /// Service accounts.
    #[serde(default)]
    pub service_accounts: Vec<ServiceAccount>,
    /// Token of the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

//! IAM API calls.

use tracing::{debug, info};

use super::models::{ListServiceAccountsResponse, ServiceAccount};
use crate::client::YandexCloud;
use crate::error::CloudError;
use crate::services::name_filter;

impl YandexCloud {
    /// List service accounts of a folder matching a filter expression.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn list_service_accounts(
        &self,
        folder_id: &str,
        filter: &str,
    ) -> Result<Vec<ServiceAccount>, CloudError> {
        let url = format!("{}/iam/v1/serviceAccounts", self.endpoints.iam);
        let response: ListServiceAccountsResponse = self
            .get(&url, &[("folderId", folder_id), ("filter", filter)])
            .await?;

        Ok(response.service_accounts)
    }

    /// Resolve a service account ID from either an explicit ID or a name.
    ///
    /// An explicit ID wins. A name is looked up in the folder. Neither yields
    /// `None`.
    ///
    /// # Errors
    /// Returns error if the lookup fails or no account has the given name.
    pub async fn resolve_service_account_id(
        &self,
        folder_id: &str,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<String>, CloudError> {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            return Ok(Some(id.to_string()));
        }

        let Some(name) = name.filter(|name| !name.is_empty()) else {
            return Ok(None);
        };

        debug!(folder_id = %folder_id, name = %name, "Looking up service account");
        let accounts = self
            .list_service_accounts(folder_id, &name_filter(name))
            .await?;

        let account = accounts.into_iter().next().ok_or_else(|| {
            CloudError::NotFound(format!("service account with name {name} not found"))
        })?;

        info!(service_account_id = %account.id, name = %name, "Resolved service account");
        Ok(Some(account.id))
    }
}

//! Long-running operations.
//!
//! Every mutating Yandex Cloud call returns an [`Operation`]. The typed
//! result is carried either in `metadata` (IDs of the created resource) or in
//! `response` (the resource itself) once the operation is done.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CloudError;

/// A long-running operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation ID.
    pub id: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
    /// Whether the operation has finished.
    #[serde(default)]
    pub done: bool,
    /// Service specific metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Result on success.
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    /// Result on failure.
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Error status of a failed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    /// gRPC status code.
    #[serde(default)]
    pub code: i32,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Turn a finished operation carrying an error into [`CloudError::Operation`].
    ///
    /// # Errors
    /// Returns error if the operation failed.
    pub fn into_result(self) -> Result<Self, CloudError> {
        match self.error {
            Some(error) => Err(CloudError::Operation {
                id: self.id,
                code: error.code,
                message: error.message,
            }),
            None => Ok(self),
        }
    }

    /// Decode the operation metadata.
    ///
    /// # Errors
    /// Returns error if there is no metadata or it does not match `T`.
    pub fn metadata_as<T: DeserializeOwned>(&self) -> Result<T, CloudError> {
        Self::decode(&self.id, "metadata", self.metadata.as_ref())
    }

    /// Decode the operation response.
    ///
    /// # Errors
    /// Returns error if there is no response or it does not match `T`.
    pub fn response_as<T: DeserializeOwned>(&self) -> Result<T, CloudError> {
        Self::decode(&self.id, "response", self.response.as_ref())
    }

    fn decode<T: DeserializeOwned>(
        id: &str,
        field: &str,
        value: Option<&serde_json::Value>,
    ) -> Result<T, CloudError> {
        let value = value.ok_or_else(|| {
            CloudError::Api {
                status: 200,
                message: format!("operation {id} has no {field}"),
            }
        })?;
        Ok(T::deserialize(value)?)
    }
}

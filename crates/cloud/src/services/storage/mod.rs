//! Object Storage.
//!
//! Objects are accessed over the S3 compatible HTTP API, authenticated with
//! the IAM token in `X-YaCloud-SubjectToken` instead of S3 signatures.

mod client;
mod models;

pub use models::*;

use async_trait::async_trait;

use crate::error::CloudError;

/// Object storage operations used by the actions.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object, replacing any existing one.
    async fn put_object(&self, object: StorageObject) -> Result<(), CloudError>;

    /// Download an object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StorageObject, CloudError>;

    /// Keys of every object in a bucket.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, CloudError>;

    /// Delete an object. Missing objects are not an error.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), CloudError>;
}

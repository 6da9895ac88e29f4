//! Yandex Cloud REST client.
//!
//! Covers the services needed to deploy from CI:
//!
//! - **Serverless Functions** - functions and versions
//! - **Serverless Containers** - containers, revisions and access bindings
//! - **API Gateway** - gateways and their `OpenAPI` specifications
//! - **Compute Cloud** - instances and public images
//! - **IAM** - service account lookup and IAM tokens
//! - **Object Storage** - object upload, listing and deletion
//!
//! ## Authentication
//!
//! [`Credentials`] can be a ready IAM token, a service account authorized
//! key or an OIDC id token exchanged for a service account token. Tokens are
//! cached and refreshed before expiry.
//!
//! ## Operations
//!
//! Mutating calls return long-running operations; every method here waits
//! for its operation to finish and returns the resulting resource or ID.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod operation;
pub mod services;

pub use auth::{Credentials, ServiceAccountKey, TokenProvider};
pub use client::{Endpoints, YandexCloud};
pub use error::CloudError;
pub use models::{
    AccessBinding, Connectivity, LogDestination, LogLevel, LogOptions, Secret, Subject,
};
pub use operation::Operation;
pub use services::storage::{ObjectStore, StorageObject};
pub use services::{apigateway, compute, containers, functions, iam, storage};

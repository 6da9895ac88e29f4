//! Serverless Containers.

mod client;
mod models;

pub use models::*;

/// Role allowing unauthenticated invocation of a container.
pub const INVOKER_ROLE: &str = "serverless.containers.invoker";

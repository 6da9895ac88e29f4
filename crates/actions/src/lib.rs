//! CI/CD actions for Yandex Cloud.
//!
//! Each action reads its inputs from flags or the environment variables set
//! by the CI runner, talks to Yandex Cloud through [`yc_cloud`] and publishes
//! step outputs through [`workflow::Outputs`]:
//!
//! - [`function`] - package sources and create a function version
//! - [`container`] - deploy a serverless container revision
//! - [`apigw`] - create or update an API gateway from an `OpenAPI` spec
//! - [`coi`] - run docker-compose on a Container Optimized Image VM
//! - [`runner`] - start and stop ephemeral runner VMs
//! - [`upload`] - upload a directory to Object Storage

pub mod apigw;
pub mod cli;
pub mod coi;
pub mod container;
pub mod error;
pub mod function;
pub mod inputs;
pub mod runner;
pub mod sources;
pub mod upload;
pub mod workflow;

pub use error::InputError;

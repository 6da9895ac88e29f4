//! API Gateway.

mod client;
mod models;

pub use models::*;

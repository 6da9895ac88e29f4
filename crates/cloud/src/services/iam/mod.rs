//! Identity and Access Management.
//!
//! Only service account lookup is needed by the actions.

mod client;
mod models;

pub use models::*;

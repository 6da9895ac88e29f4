//! Cloud Functions.
//!
//! A function is a named container for versions; each deploy creates a new
//! version from a zip package (inline or from object storage).

mod client;
mod models;

pub use models::*;

/// Largest package that may be sent inline instead of via object storage.
pub const MAX_INLINE_PACKAGE_BYTES: usize = 3_670_016;

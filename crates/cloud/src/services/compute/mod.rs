//! Compute Cloud.
//!
//! Virtual machines and the public image catalogue.

mod client;
mod models;

pub use models::*;

/// Folder holding the public images.
pub const STANDARD_IMAGES_FOLDER: &str = "standard-images";

//! Parsers for action inputs.
//!
//! Inputs arrive as strings (often multi-line) from the runner environment;
//! the functions here turn them into typed API values.

mod cache_control;
mod credentials;
mod duration;
mod env;
mod memory;
mod storage_mount;
mod template;

pub use cache_control::CacheControl;
pub use credentials::CredentialArgs;
pub use duration::parse_ttl;
pub use env::{parse_environment, parse_secret, parse_secrets};
pub use memory::parse_memory;
pub use storage_mount::{parse_storage_mount, parse_storage_mounts};
pub use template::{render_env_template, render_template};

use yc_cloud::LogLevel;

use crate::error::InputError;

/// Parse a log level name; empty means unspecified.
///
/// # Errors
///
/// Returns [`InputError::LogLevel`] for unknown names.
pub fn parse_log_level(value: &str) -> Result<LogLevel, InputError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(LogLevel::default());
    }
    value
        .parse()
        .map_err(|_| InputError::LogLevel(value.to_string()))
}

/// Value of a required input.
///
/// # Errors
///
/// Returns [`InputError::Missing`] when the input is unset or blank.
pub fn required<'a>(value: Option<&'a String>, name: &'static str) -> Result<&'a str, InputError> {
    optional(value).ok_or(InputError::Missing(name))
}

/// Trimmed value of an optional input; blank counts as unset.
#[must_use]
pub fn optional(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Non-empty, trimmed lines of a multi-line input.
pub(crate) fn non_empty_lines(lines: &[String]) -> impl Iterator<Item = &str> {
    lines
        .iter()
        .flat_map(|chunk| chunk.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

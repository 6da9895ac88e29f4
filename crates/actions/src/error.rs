//! Input validation errors.

use thiserror::Error;

/// Errors raised while parsing and validating action inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Required input is missing or empty.
    #[error("{0} is required")]
    Missing(&'static str),

    /// Mutually exclusive inputs were combined.
    #[error("{0}")]
    Conflict(String),

    /// Memory or disk size is not `<digits>Mb` or `<digits>Gb`.
    #[error("memory has unknown format: {0}")]
    Memory(String),

    /// Log level is not a known level.
    #[error("log level has unknown value: {0}")]
    LogLevel(String),

    /// Lockbox secret reference is malformed.
    #[error("Broken reference to Lockbox Secret: {input} ({reason})")]
    Secret {
        /// Offending line.
        input: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Environment variable line is malformed.
    #[error("environment variable has empty key: {0}")]
    Environment(String),

    /// Storage mount spec is malformed.
    #[error("storage mount {reason}: {input}")]
    StorageMount {
        /// Offending line.
        input: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Duration string could not be parsed.
    #[error("invalid duration '{input}': {reason}")]
    Duration {
        /// Offending value.
        input: String,
        /// Parser message.
        reason: String,
    },

    /// Template could not be rendered.
    #[error("failed to render template: {0}")]
    Template(String),

    /// Unknown mode of a multi-mode action.
    #[error("wrong mode '{0}'. Allowed values: start, stop")]
    Mode(String),
}

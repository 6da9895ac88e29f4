//! Types shared by several services.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Logging
// ============================================================================

/// Minimum level of function and container logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Level not set; the service default applies.
    #[default]
    LevelUnspecified,
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
    /// Fatal.
    Fatal,
}

/// Log level string is not one of the known levels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("log level has unknown value: {0}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    /// Case-insensitive; an empty string means unspecified.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "" => Ok(Self::LevelUnspecified),
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelUnspecified => write!(f, "unspecified"),
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Where logs are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogDestination {
    /// A specific log group.
    LogGroupId(String),
    /// The default log group of a folder.
    FolderId(String),
}

/// Logging options of a function version or container revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOptions {
    /// Disable logging.
    #[serde(default)]
    pub disabled: bool,
    /// Destination log group; the folder default when unset.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub destination: Option<LogDestination>,
    /// Minimum log level.
    #[serde(default)]
    pub min_level: LogLevel,
}

// ============================================================================
// Lockbox secrets
// ============================================================================

/// Lockbox secret exposed as an environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Secret ID.
    pub id: String,
    /// Secret version ID.
    pub version_id: String,
    /// Key inside the secret payload.
    pub key: String,
    /// Target environment variable.
    pub environment_variable: String,
}

// ============================================================================
// Access bindings
// ============================================================================

/// Role granted to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessBinding {
    /// Role, e.g. `serverless.containers.invoker`.
    pub role_id: String,
    /// Grantee.
    pub subject: Subject,
}

/// Grantee of an access binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject ID, e.g. `allUsers`.
    pub id: String,
    /// Subject type, e.g. `system`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Network attachment of a function or container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    /// VPC network ID.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_id: String,
    /// Subnets within the network.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_id: Vec<String>,
}

// ============================================================================
// Wire helpers
// ============================================================================

/// Encode a duration in seconds the way the API expects (`"5s"`).
#[must_use]
pub fn duration_secs(secs: i64) -> String {
    format!("{secs}s")
}

/// int64 fields travel as JSON strings.
pub mod int64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal string.
    ///
    /// # Errors
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Accept either a string or a number.
    ///
    /// # Errors
    /// Returns error for anything that is not an integer.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
            Raw::Number(number) => Ok(number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("".parse::<LogLevel>().unwrap(), LogLevel::LevelUnspecified);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("FATAL".parse::<LogLevel>().unwrap(), LogLevel::Fatal);

        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().starts_with("log level has unknown value"));
    }

    #[test]
    fn test_log_options_wire_format() {
        let options = LogOptions {
            disabled: false,
            destination: Some(LogDestination::LogGroupId("e23".into())),
            min_level: LogLevel::Info,
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"disabled": false, "logGroupId": "e23", "minLevel": "INFO"})
        );

        let default = serde_json::to_value(LogOptions::default()).unwrap();
        assert_eq!(
            default,
            serde_json::json!({"disabled": false, "minLevel": "LEVEL_UNSPECIFIED"})
        );
    }

    #[test]
    fn test_int64_accepts_string_and_number() {
        #[derive(Deserialize, serde::Serialize)]
        struct Resources {
            #[serde(with = "int64")]
            memory: i64,
        }

        let from_string: Resources = serde_json::from_str(r#"{"memory": "134217728"}"#).unwrap();
        let from_number: Resources = serde_json::from_str(r#"{"memory": 134217728}"#).unwrap();
        assert_eq!(from_string.memory, 134_217_728);
        assert_eq!(from_number.memory, 134_217_728);
        assert_eq!(
            serde_json::to_string(&from_string).unwrap(),
            r#"{"memory":"134217728"}"#
        );
    }
}

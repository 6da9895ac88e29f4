use std::collections::BTreeMap;

use tracing::{info, warn};
use yc_cloud::Secret;

use super::non_empty_lines;
use crate::error::InputError;

/// Parse `KEY=VALUE` lines into a map.
///
/// Lines without `=` are skipped. Key and value are trimmed.
///
/// # Errors
///
/// Returns [`InputError::Environment`] when a key is empty.
pub fn parse_environment(lines: &[String]) -> Result<BTreeMap<String, String>, InputError> {
    let mut environment = BTreeMap::new();

    for line in non_empty_lines(lines) {
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = %line, "Skipping environment line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(InputError::Environment(line.to_string()));
        }
        environment.insert(key.to_string(), value.trim().to_string());
    }

    info!(keys = ?environment.keys().collect::<Vec<_>>(), "Parsed environment");
    Ok(environment)
}

/// Parse a Lockbox reference `ENV_VAR=secretId/versionId/key`.
///
/// # Errors
///
/// Returns [`InputError::Secret`] describing what is malformed.
pub fn parse_secret(input: &str) -> Result<Secret, InputError> {
    let broken = |reason| InputError::Secret {
        input: input.to_string(),
        reason,
    };

    let parts: Vec<&str> = input.split('=').collect();
    let [env_var, path] = parts.as_slice() else {
        return Err(broken("wrong format"));
    };
    let (env_var, path) = (env_var.trim(), path.trim());

    if env_var.is_empty() {
        return Err(broken("empty environment variable"));
    }
    if path.is_empty() {
        return Err(broken("empty path"));
    }

    let segments: Vec<&str> = path.split('/').collect();
    let [id, version_id, key] = segments.as_slice() else {
        return Err(broken("path should be secretId/versionId/key"));
    };
    if id.is_empty() || version_id.is_empty() || key.is_empty() {
        return Err(broken("path has empty parts"));
    }

    Ok(Secret {
        id: (*id).to_string(),
        version_id: (*version_id).to_string(),
        key: (*key).to_string(),
        environment_variable: env_var.to_string(),
    })
}

/// Parse Lockbox references, one per line. Empty lines are skipped.
///
/// # Errors
///
/// Fails on the first malformed reference.
pub fn parse_secrets(lines: &[String]) -> Result<Vec<Secret>, InputError> {
    let secrets = non_empty_lines(lines)
        .map(parse_secret)
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = secrets.len(), "Parsed secrets");
    Ok(secrets)
}

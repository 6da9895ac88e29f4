use std::time::Duration;

use crate::error::InputError;

/// Parse a human duration such as `30m`, `1h` or `1h 30m`.
///
/// # Errors
///
/// Returns [`InputError::Duration`] when the value is not a duration.
pub fn parse_ttl(value: &str) -> Result<Duration, InputError> {
    humantime::parse_duration(value.trim()).map_err(|e| InputError::Duration {
        input: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_ttl("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_ttl(" 1h 30m ").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_ttl("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_parse_ttl_invalid() {
        let err = parse_ttl("soon").unwrap_err();
        assert!(err.to_string().starts_with("invalid duration 'soon'"));
    }
}

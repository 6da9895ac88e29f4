use std::sync::LazyLock;

use regex::Regex;

use crate::error::InputError;

const MB: i64 = 1024 * 1024;
const GB: i64 = 1024 * MB;

static MEMORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s?(mb|gb)$").unwrap());

/// Parse a size such as `128Mb`, `2 GB` or `1gb` into bytes.
///
/// # Errors
///
/// Returns [`InputError::Memory`] when the value is not `<digits>Mb|Gb`
/// or does not fit into an `i64`.
pub fn parse_memory(value: &str) -> Result<i64, InputError> {
    let invalid = || InputError::Memory(value.to_string());

    let captures = MEMORY_PATTERN.captures(value).ok_or_else(invalid)?;
    let amount: i64 = captures[1].parse().map_err(|_| invalid())?;
    let unit = if captures[2].eq_ignore_ascii_case("gb") { GB } else { MB };

    amount.checked_mul(unit).ok_or_else(invalid)
}

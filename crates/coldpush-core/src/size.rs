//! Human-readable size parsing.
//!
//! Sizes are a number followed by an optional unit, e.g. `"64MiB"`,
//! `"4 MB"`, `"1.5G"` or `"1048576"`. Units are always interpreted as binary
//! multiples: `MB`, `MiB` and `M` all mean 1024 * 1024 bytes. A bare number
//! is a byte count.

use crate::error::ConfigError;

/// Unit prefixes in increasing order of magnitude (powers of 1024).
const PREFIXES: [char; 6] = ['k', 'm', 'g', 't', 'p', 'e'];

/// Parse a human-readable size into a number of bytes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSize`] if the number or unit is malformed,
/// or if the result does not fit in a `u64`.
///
/// # Examples
///
/// ```
/// use coldpush_core::size::parse_size;
///
/// assert_eq!(parse_size("4MB").unwrap(), 4 * 1024 * 1024);
/// assert_eq!(parse_size("64 MiB").unwrap(), 64 * 1024 * 1024);
/// assert_eq!(parse_size("512").unwrap(), 512);
/// assert!(parse_size("lots").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    if number.is_empty() {
        return Err(invalid(input, "expected a number"));
    }

    let multiplier = unit_multiplier(unit.trim()).ok_or_else(|| invalid(input, "unknown unit"))?;

    if number.contains('.') {
        parse_fractional(input, number, multiplier)
    } else {
        let value: u64 = number
            .parse()
            .map_err(|_| invalid(input, "malformed number"))?;
        value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid(input, "size too large"))
    }
}

/// Resolve a unit suffix to its byte multiplier.
fn unit_multiplier(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_lowercase();
    if matches!(unit.as_str(), "" | "b" | "byte" | "bytes") {
        return Some(1);
    }

    let mut chars = unit.chars();
    let prefix = chars.next()?;
    let rest = chars.as_str();
    if !matches!(rest, "" | "b" | "ib") {
        return None;
    }

    let exponent = PREFIXES.iter().position(|&p| p == prefix)?;
    // exponent <= 5, so 1024^(exponent + 1) <= 2^60.
    Some(1u64 << (10 * (exponent + 1)))
}

// Precision loss is bounded by f64 and mirrors integer truncation of the
// product, which is how fractional sizes are defined.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn parse_fractional(input: &str, number: &str, multiplier: u64) -> Result<u64, ConfigError> {
    let value: f64 = number
        .parse()
        .map_err(|_| invalid(input, "malformed number"))?;
    let bytes = (value * multiplier as f64).floor();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(invalid(input, "size too large"));
    }
    Ok(bytes as u64)
}

fn invalid(input: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidSize {
        input: input.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_should_parse_plain_byte_count() {
        assert_eq!(parse_size("1048576").unwrap(), MIB);
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("  42 ").unwrap(), 42);
    }

    #[test]
    fn test_should_treat_decimal_units_as_binary() {
        assert_eq!(parse_size("4MB").unwrap(), 4 * MIB);
        assert_eq!(parse_size("4MiB").unwrap(), 4 * MIB);
        assert_eq!(parse_size("4M").unwrap(), 4 * MIB);
        assert_eq!(parse_size("4mb").unwrap(), 4 * MIB);
    }

    #[test]
    fn test_should_parse_larger_units() {
        assert_eq!(parse_size("2GB").unwrap(), 2048 * MIB);
        assert_eq!(parse_size("4 GiB").unwrap(), 4096 * MIB);
        assert_eq!(parse_size("1T").unwrap(), 1024 * 1024 * MIB);
        assert_eq!(parse_size("16KiB").unwrap(), 16 * 1024);
    }

    #[test]
    fn test_should_parse_byte_units() {
        assert_eq!(parse_size("10 bytes").unwrap(), 10);
        assert_eq!(parse_size("10B").unwrap(), 10);
    }

    #[test]
    fn test_should_parse_fractional_sizes() {
        assert_eq!(parse_size("1.5KB").unwrap(), 1536);
        assert_eq!(parse_size("0.5 MiB").unwrap(), MIB / 2);
    }

    #[test]
    fn test_should_reject_malformed_sizes() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("12 parsecs").is_err());
        assert!(parse_size("1.2.3MB").is_err());
        assert!(parse_size("4 MiBs").is_err());
    }

    #[test]
    fn test_should_reject_overflowing_sizes() {
        assert!(parse_size("99999999999999999999").is_err());
        assert!(parse_size("100000E").is_err());
    }
}

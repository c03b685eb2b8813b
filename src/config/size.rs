// Minimum file size parsing
// Accepts plain byte counts and k/m suffixed values ("512", "10k", "2 MB")

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

const KILOBYTE: i64 = 1024;
const MEGABYTE: i64 = 1_048_576;

/// Invalid `min_size` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeParseError {
    input: String,
}

impl fmt::Display for SizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid size in min_size: '{}'", self.input)
    }
}

impl std::error::Error for SizeParseError {}

/// Parse a size setting into bytes
///
/// Negative values and values that overflow after applying the suffix leave
/// the minimum unset (`Ok(None)`). Unknown suffixes are an error.
pub fn parse_size(input: &str) -> Result<Option<u64>, SizeParseError> {
    let invalid = || SizeParseError {
        input: input.to_string(),
    };

    let trimmed = input.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits_end == 0 {
        return Err(invalid());
    }
    let (digits, suffix) = unsigned.split_at(digits_end);

    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => KILOBYTE,
        "m" | "mb" => MEGABYTE,
        _ => return Err(invalid()),
    };

    let Ok(value) = digits.parse::<i64>() else {
        return Ok(None);
    };
    let value = if negative { -value } else { value };
    Ok(value
        .checked_mul(multiplier)
        .and_then(|bytes| u64::try_from(bytes).ok()))
}

/// Serde adapter for optional size fields
///
/// Integers are taken as byte counts; strings go through [`parse_size`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(SizeVisitor)
}

struct SizeVisitor;

impl<'de> Visitor<'de> for SizeVisitor {
    type Value = Option<u64>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a byte count or a size string such as \"10k\"")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(u64::try_from(v).ok())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_size(v).map_err(E::custom)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bytes() {
        assert_eq!(parse_size("0"), Ok(Some(0)));
        assert_eq!(parse_size("512"), Ok(Some(512)));
        assert_eq!(parse_size("  512"), Ok(Some(512)));
        assert_eq!(parse_size("512b"), Ok(Some(512)));
        assert_eq!(parse_size("512 B"), Ok(Some(512)));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_size("10k"), Ok(Some(10_240)));
        assert_eq!(parse_size("10K"), Ok(Some(10_240)));
        assert_eq!(parse_size("10 kb"), Ok(Some(10_240)));
        assert_eq!(parse_size("2m"), Ok(Some(2_097_152)));
        assert_eq!(parse_size("2MB"), Ok(Some(2_097_152)));
    }

    #[test]
    fn test_negative_is_unset() {
        assert_eq!(parse_size("-1"), Ok(None));
        assert_eq!(parse_size("-5k"), Ok(None));
        assert_eq!(parse_size("-0"), Ok(Some(0)));
    }

    #[test]
    fn test_overflow_is_unset() {
        assert_eq!(parse_size("9223372036854775807m"), Ok(None));
        assert_eq!(parse_size("99999999999999999999"), Ok(None));
    }

    #[test]
    fn test_invalid_input() {
        for input in ["", "k", "10g", "10 x", "ten", "1.5k"] {
            let err = parse_size(input).unwrap_err();
            assert!(err.to_string().contains("Invalid size in min_size"), "{input}");
        }
    }

    #[test]
    fn test_deserialize_from_json() {
        #[derive(serde::Deserialize)]
        struct Scope {
            #[serde(default, deserialize_with = "deserialize")]
            min_size: Option<u64>,
        }

        let parse = |json: &str| serde_json::from_str::<Scope>(json).map(|s| s.min_size);
        assert_eq!(parse(r#"{"min_size": 2048}"#).unwrap(), Some(2048));
        assert_eq!(parse(r#"{"min_size": "4k"}"#).unwrap(), Some(4096));
        assert_eq!(parse(r#"{"min_size": -3}"#).unwrap(), None);
        assert_eq!(parse("{}").unwrap(), None);
        assert!(parse(r#"{"min_size": "4q"}"#).is_err());
    }
}

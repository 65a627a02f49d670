//! Utility functions and helpers

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::error::{Result, StakingError};

/// Character set of the bech32 data part
pub const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Render a decimal as its base-10 string
pub fn decimal_to_string(value: &Decimal) -> String {
    value.to_string()
}

/// Parse a base-10 decimal string, naming the field on failure
pub fn parse_decimal(field: &str, s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).map_err(|e| {
        StakingError::Serialization(format!("Failed to parse {} '{}': {}", field, s, e))
    })
}

/// Sum decimals, `None` if the total leaves the representable range
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

/// Render a date as RFC 3339 keeping every significant sub-second digit
pub fn date_to_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an RFC 3339 date, naming the field on failure
pub fn parse_date(field: &str, s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            StakingError::Serialization(format!("Failed to parse {} '{}': {}", field, s, e))
        })
}

/// Check the shape of a bech32 address with human-readable part `hrp`.
///
/// Only the prefix, the separator and the data-part alphabet are checked;
/// the checksum is not verified.
pub fn is_valid_bech32_like(address: &str, hrp: &str) -> bool {
    let Some(data) = address.strip_prefix(hrp).and_then(|rest| rest.strip_prefix('1')) else {
        return false;
    };

    // at least the six checksum characters
    if data.len() < 6 || address.len() > 90 {
        return false;
    }

    data.chars().all(|c| BECH32_CHARSET.contains(c))
}

/// Truncate an address for log output
pub fn short_address(address: &str) -> String {
    let count = address.chars().count();
    if count <= 16 {
        return address.to_string();
    }
    let head: String = address.chars().take(10).collect();
    let tail: String = address.chars().skip(count - 6).collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_strings_keep_scale() {
        let parsed = parse_decimal("amount", "100.50").unwrap();
        assert_eq!(parsed, dec!(100.5));
        assert_eq!(decimal_to_string(&parsed), "100.50");
        assert!(parse_decimal("amount", "1e").is_err());
    }

    #[test]
    fn test_date_strings_are_lossless() {
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let text = date_to_string(&date);
        assert_eq!(text, "2023-11-14T22:13:20.123456Z");
        assert_eq!(parse_date("completionDate", &text).unwrap(), date);

        let whole = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(date_to_string(&whole), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_bech32_like_addresses() {
        assert!(is_valid_bech32_like(
            "cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5",
            "cosmos"
        ));
        assert!(is_valid_bech32_like(
            "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7",
            "cosmosvaloper"
        ));
        // validator address is not an account address
        assert!(!is_valid_bech32_like(
            "cosmosvaloper1grgelyng2v6v3t8z87wu3sxgt9m5s03xfytvz7",
            "cosmos"
        ));
        // 'b' is outside the data alphabet
        assert!(!is_valid_bech32_like("cosmos1bbbbbbbb", "cosmos"));
        assert!(!is_valid_bech32_like("", "cosmos"));
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2)]), Some(dec!(3.5)));
        assert_eq!(checked_sum(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(checked_sum([Decimal::MAX, dec!(1)]), None);
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address("short"), "short");
        assert_eq!(
            short_address("cosmos108uy5q9jt59gwugq5yrdhkzcd9jryslmpcstk5"),
            "cosmos108u...pcstk5"
        );
        // counted in characters, never split inside one
        assert_eq!(
            short_address("cosmos1ééééééééééééééééqqqqqq"),
            "cosmos1ééé...qqqqqq"
        );
    }
}

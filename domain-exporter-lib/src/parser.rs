//! Extraction of registration dates from raw whois text.
//!
//! Only two keys are recognized, both in the style of the `.ru`/`.su`
//! registries:
//!
//! ```text
//! paid-till:     2030-01-15T00:00:00Z
//! free-date:     2030-02-15
//! ```
//!
//! A line is considered only when it splits into exactly two
//! whitespace-separated tokens. Everything else is ignored, which also means
//! multi-word values are never picked up.

use crate::error::ExporterError;
use chrono::{DateTime, NaiveDate, Utc};

pub const PAID_TILL_KEY: &str = "paid-till";
pub const FREE_DATE_KEY: &str = "free-date";

/// State of one recognized field after a parse pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// The key never appeared
    Missing,
    /// The last occurrence of the key parsed
    Parsed(T),
    /// The last occurrence of the key did not parse
    Invalid { value: String, reason: String },
}

impl<T: Copy> Field<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(*value),
            _ => None,
        }
    }

    fn require(&self, key: &str) -> Result<T, ExporterError> {
        match self {
            Self::Parsed(value) => Ok(*value),
            Self::Missing => Err(ExporterError::field_missing(key)),
            Self::Invalid { value, reason } => {
                Err(ExporterError::field_invalid(key, value.clone(), reason.clone()))
            }
        }
    }
}

/// Fields extracted from one whois response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub paid_till: Field<DateTime<Utc>>,
    pub free_date: Field<DateTime<Utc>>,
}

impl ParsedRecord {
    /// Both timestamps, or the first field error.
    ///
    /// A record counts as complete only when both fields parsed; anything
    /// else fails the whole probe.
    pub fn complete(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ExporterError> {
        let paid_till = self.paid_till.require(PAID_TILL_KEY)?;
        let free_date = self.free_date.require(FREE_DATE_KEY)?;
        Ok((paid_till, free_date))
    }
}

/// Parse raw whois output into a [`ParsedRecord`].
///
/// Never fails as a whole: unknown lines are skipped and bad values are
/// recorded on the field they belong to. When a key repeats, the last
/// occurrence wins.
pub fn parse_record(raw: &str) -> ParsedRecord {
    let mut record = ParsedRecord {
        paid_till: Field::Missing,
        free_date: Field::Missing,
    };

    for line in raw.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(key), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            continue;
        };

        match key.trim().trim_end_matches(':') {
            PAID_TILL_KEY => record.paid_till = to_field(value, parse_paid_till(value)),
            FREE_DATE_KEY => record.free_date = to_field(value, parse_free_date(value)),
            _ => {}
        }
    }

    record
}

fn to_field<T>(value: &str, parsed: Result<T, chrono::ParseError>) -> Field<T> {
    match parsed {
        Ok(parsed) => Field::Parsed(parsed),
        Err(e) => Field::Invalid {
            value: value.to_string(),
            reason: e.to_string(),
        },
    }
}

/// `paid-till` carries a full RFC 3339 timestamp with offset.
fn parse_paid_till(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// `free-date` is a bare calendar date, taken as midnight UTC.
fn parse_free_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RU_RESPONSE: &str = "% TCI Whois Service. Terms of use:\n\
        % https://tcinet.ru/documents/whois_ru_rf.pdf (in Russian)\n\
        \n\
        domain:        EXAMPLE.RU\n\
        nserver:       ns1.example.ru.\n\
        state:         REGISTERED, DELEGATED, VERIFIED\n\
        org:           Example LLC\n\
        registrar:     RU-CENTER-RU\n\
        admin-contact: https://www.nic.ru/whois\n\
        created:       1999-07-12T20:00:00Z\n\
        paid-till:     2030-01-15T00:00:00Z\n\
        free-date:     2030-02-15\n\
        source:        TCI\n";

    #[test]
    fn test_parse_full_response() {
        let record = parse_record(RU_RESPONSE);

        assert_eq!(
            record.paid_till,
            Field::Parsed(Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            record.free_date,
            Field::Parsed(Utc.with_ymd_and_hms(2030, 2, 15, 0, 0, 0).unwrap())
        );
        assert!(record.complete().is_ok());
    }

    #[test]
    fn test_paid_till_offset_is_normalized_to_utc() {
        let record = parse_record("paid-till: 2030-01-15T03:00:00+03:00\n");
        assert_eq!(
            record.paid_till.value(),
            Some(Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_no_recognized_lines() {
        let record = parse_record("No entries found for the selected source(s).\n");
        assert_eq!(record.paid_till, Field::Missing);
        assert_eq!(record.free_date, Field::Missing);

        let err = record.complete().unwrap_err();
        assert!(err.to_string().contains("paid-till"));
    }

    #[test]
    fn test_missing_single_field_fails_record() {
        let record = parse_record("paid-till: 2030-01-15T00:00:00Z\n");
        assert!(record.paid_till.value().is_some());

        match record.complete() {
            Err(ExporterError::FieldParse { field, value, .. }) => {
                assert_eq!(field, "free-date");
                assert!(value.is_none());
            }
            other => panic!("expected free-date parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_is_recorded_and_parsing_continues() {
        let record = parse_record("paid-till: tomorrow\nfree-date: 2030-02-15\n");

        assert!(matches!(record.paid_till, Field::Invalid { ref value, .. } if value == "tomorrow"));
        assert!(record.free_date.value().is_some());

        match record.complete() {
            Err(ExporterError::FieldParse { field, value, .. }) => {
                assert_eq!(field, "paid-till");
                assert_eq!(value.as_deref(), Some("tomorrow"));
            }
            other => panic!("expected paid-till parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_date_only_paid_till_is_rejected() {
        // paid-till needs time and offset
        let record = parse_record("paid-till: 2030-01-15\nfree-date: 2030-02-15\n");
        assert!(matches!(record.paid_till, Field::Invalid { .. }));
    }

    #[test]
    fn test_lines_without_exactly_two_tokens_are_skipped() {
        let raw = "paid-till:\n\
                   paid-till: 2030-01-15T00:00:00Z extra\n\
                   free-date: 2030-02-15 (estimated)\n";
        let record = parse_record(raw);
        assert_eq!(record.paid_till, Field::Missing);
        assert_eq!(record.free_date, Field::Missing);
    }

    #[test]
    fn test_keys_are_case_sensitive_and_exact() {
        let raw = "Paid-Till: 2030-01-15T00:00:00Z\n\
                   free-date-estimate: 2030-02-15\n\
                   paid-till 2030-01-15T00:00:00Z\n\
                   free-date:: 2030-02-15\r\n";
        let record = parse_record(raw);
        // Bare key without a colon and a doubled colon both normalize to the key
        assert!(record.paid_till.value().is_some());
        assert!(record.free_date.value().is_some());

        let record = parse_record("Paid-Till: 2030-01-15T00:00:00Z\n");
        assert_eq!(record.paid_till, Field::Missing);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let record = parse_record(
            "free-date: 2030-02-15\nfree-date: 2031-02-15\npaid-till: 2030-01-15T00:00:00Z\npaid-till: never\n",
        );
        assert_eq!(
            record.free_date.value(),
            Some(Utc.with_ymd_and_hms(2031, 2, 15, 0, 0, 0).unwrap())
        );
        assert!(matches!(record.paid_till, Field::Invalid { .. }));
    }

    #[test]
    fn test_parse_is_stable() {
        assert_eq!(parse_record(RU_RESPONSE), parse_record(RU_RESPONSE));
    }
}

//! Jingles: the catalogued content units that repeat edges connect.

pub mod model;

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00Z`) and bare dates (`2024-01-01`,
/// read as midnight UTC). Blank strings read as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2024-02-01T12:30:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_bare_date() {
        let ts = parse_timestamp("2024-01-01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("last tuesday"), None);
    }
}

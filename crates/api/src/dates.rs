//! Date path segments

use crate::ApiError;
use chrono::NaiveDate;

const ISO_DATE: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` path segment
pub fn parse_iso_date(segment: &str) -> Result<NaiveDate, ApiError> {
    let well_formed = segment.len() == 10
        && segment.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(ApiError::MalformedDate {
            value: segment.to_string(),
            reason: "expected an ISO date in YYYY-MM-DD form".to_string(),
        });
    }

    NaiveDate::parse_from_str(segment, ISO_DATE).map_err(|e| ApiError::MalformedDate {
        value: segment.to_string(),
        reason: e.to_string(),
    })
}

/// Format a date the way it is emitted in JSON keys
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}

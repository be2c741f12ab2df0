//! Date helpers shared by the request layer and report filenames.

use chrono::{Duration, NaiveDate};

use crate::AnalyticsError;

/// Placeholder shown in place of an unknown date.
pub const MISSING_DATE: &str = "—";

pub const MAX_LATEST_DAYS: u32 = 3650;

/// Accept only `YYYY-MM-DD`.
pub fn validate_iso_date(value: &str, field: &str) -> Result<NaiveDate, AnalyticsError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .filter(|_| value.len() == 10)
        .ok_or_else(|| {
            AnalyticsError::InvalidDate(format!("'{field}' must be formatted as YYYY-MM-DD"))
        })
}

pub fn validate_range(from: &str, to: &str) -> Result<(NaiveDate, NaiveDate), AnalyticsError> {
    let f = validate_iso_date(from, "from")?;
    let t = validate_iso_date(to, "to")?;
    if f > t {
        return Err(AnalyticsError::InvalidRange(
            "'from' must not be after 'to'".into(),
        ));
    }
    Ok((f, t))
}

/// `[today - days, today]` rendered as `YYYY-MM-DD`.
pub fn latest_range(today: NaiveDate, days: u32) -> Result<(String, String), AnalyticsError> {
    if !(1..=MAX_LATEST_DAYS).contains(&days) {
        return Err(AnalyticsError::InvalidRange(format!(
            "'days' must be between 1 and {MAX_LATEST_DAYS}"
        )));
    }
    let from = today - Duration::days(i64::from(days));
    Ok((
        from.format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    ))
}

/// `YYYY-MM-DD...` -> `DD-MM-YYYY`. Values that do not look like an ISO date
/// are returned unchanged.
pub fn ymd_to_dmy(value: &str) -> String {
    let b = value.as_bytes();
    if b.len() >= 10 && b[4] == b'-' && b[7] == b'-' && value.is_char_boundary(10) {
        format!("{}-{}-{}", &value[8..10], &value[5..7], &value[0..4])
    } else {
        value.to_string()
    }
}

/// Download name of the PDF export for a range.
pub fn report_filename(from: Option<&str>, to: Option<&str>) -> String {
    let conv = |v: Option<&str>| match v {
        Some(s) if !s.is_empty() => ymd_to_dmy(s),
        _ => MISSING_DATE.to_string(),
    };
    format!("Progreso_del_{}_al_{}.pdf", conv(from), conv(to))
}

//! Backtest window start dates.

use chrono::{Local, Months, NaiveDate, NaiveDateTime};

use super::error::SweepError;

/// Date formats accepted for sweep dates, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Date-time formats accepted for sweep dates; the time part is dropped.
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a sweep date.
///
/// Accepts `yyyy-MM-dd`, `MM/dd/yyyy` and ISO date-times.
///
/// # Errors
///
/// Returns [`SweepError::InvalidDate`] if no format matches.
pub fn parse_date(value: &str) -> Result<NaiveDate, SweepError> {
    let trimmed = value.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .ok_or_else(|| SweepError::InvalidDate {
            value: value.to_string(),
        })
}

/// Add whole calendar months, clamping the day to the end of the month.
///
/// # Errors
///
/// Returns [`SweepError::InvalidDate`] if the result leaves chrono's range.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, SweepError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| SweepError::InvalidDate {
            value: format!("{date} + {months} months"),
        })
}

/// Window start dates from `start`, `months` apart, as of today.
///
/// # Errors
///
/// See [`windows_until`].
pub fn windows(start: NaiveDate, months: i32) -> Result<Vec<NaiveDate>, SweepError> {
    windows_until(start, months, Local::now().date_naive())
}

/// Window start dates from `start`, `months` apart, bounded by `today`.
///
/// `start` is always included. After each appended window the cursor
/// advances by `months`, and the next window is appended only while the one
/// after it would still start on or before `today`.
///
/// # Errors
///
/// [`SweepError::InvalidDuration`] when `months <= 0`,
/// [`SweepError::InvalidDate`] on calendar overflow.
pub fn windows_until(
    start: NaiveDate,
    months: i32,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, SweepError> {
    let step = u32::try_from(months)
        .ok()
        .filter(|m| *m > 0)
        .ok_or(SweepError::InvalidDuration { months })?;

    let mut dates = Vec::new();
    let mut date = start;
    loop {
        dates.push(date);
        date = add_months(date, step)?;
        if add_months(date, step)? > today {
            break;
        }
    }

    Ok(dates)
}

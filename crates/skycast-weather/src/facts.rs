//! Facts derived from a loaded payload.
//!
//! All functions are pure. Day selection scans `days` in provider order and
//! keeps the first record on ties.

use crate::types::{DayRecord, WeatherError, WeatherPayload};
use serde_json::{Map, Value};

/// Current conditions, or an empty map when the payload has none.
pub fn current_conditions(payload: &WeatherPayload) -> Map<String, Value> {
    payload.current_conditions().cloned().unwrap_or_default()
}

/// Mean of `temp` over all days.
///
/// A day without `temp` contributes 0 and still counts toward the divisor.
///
/// # Errors
/// Returns `WeatherError::NoData` if the payload has no days.
pub fn week_average_temp(payload: &WeatherPayload) -> Result<f64, WeatherError> {
    let days = non_empty_days(payload)?;
    let total: f64 = days.iter().map(|day| day.temp().unwrap_or(0.0)).sum();
    Ok(total / days.len() as f64)
}

/// Day with the highest `tempmax` (missing counts as -inf).
///
/// # Errors
/// Returns `WeatherError::NoData` if the payload has no days.
pub fn max_temp_day(payload: &WeatherPayload) -> Result<&DayRecord, WeatherError> {
    first_max_by(non_empty_days(payload)?, |day| {
        day.tempmax().unwrap_or(f64::NEG_INFINITY)
    })
}

/// Day with the lowest `tempmin` (missing counts as +inf).
///
/// # Errors
/// Returns `WeatherError::NoData` if the payload has no days.
pub fn min_temp_day(payload: &WeatherPayload) -> Result<&DayRecord, WeatherError> {
    first_max_by(non_empty_days(payload)?, |day| {
        -day.tempmin().unwrap_or(f64::INFINITY)
    })
}

/// Day with the highest `precipprob` (missing counts as 0).
///
/// # Errors
/// Returns `WeatherError::NoData` if the payload has no days.
pub fn highest_precip_day(payload: &WeatherPayload) -> Result<&DayRecord, WeatherError> {
    first_max_by(non_empty_days(payload)?, |day| day.precipprob().unwrap_or(0.0))
}

fn non_empty_days(payload: &WeatherPayload) -> Result<&[DayRecord], WeatherError> {
    if payload.days.is_empty() {
        return Err(WeatherError::NoData);
    }
    Ok(&payload.days)
}

// `Iterator::max_by` keeps the last maximum; this keeps the first.
fn first_max_by<F>(days: &[DayRecord], key: F) -> Result<&DayRecord, WeatherError>
where
    F: Fn(&DayRecord) -> f64,
{
    let mut iter = days.iter();
    let mut best = iter.next().ok_or(WeatherError::NoData)?;
    let mut best_key = key(best);

    for day in iter {
        let k = key(day);
        if k > best_key {
            best = day;
            best_key = k;
        }
    }

    Ok(best)
}

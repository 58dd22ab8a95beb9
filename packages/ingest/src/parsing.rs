//! Shared parsing helpers for raw logbook rows.
//!
//! Lenient date and coordinate parsing used during row normalization.
//! Callers decide whether a `None` means "skip the row" or "abort".

use chrono::{NaiveDate, NaiveDateTime};
use outbreak_map_outbreak_models::CoordinateValue;

/// Parses a reported date as an ISO-8601 date (`2024-03-17`), also
/// accepting a full timestamp (`2024-03-17T08:45:00`) whose date part is
/// taken.
#[must_use]
pub fn parse_reported_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(datetime.date());
    }
    None
}

/// Coerces a lat/lng pair to `f64`. Returns `None` if either value is
/// missing a numeric interpretation or is non-finite.
#[must_use]
pub fn parse_lat_lng(lat: &CoordinateValue, lng: &CoordinateValue) -> Option<(f64, f64)> {
    let latitude = lat.as_f64()?;
    let longitude = lng.as_f64()?;
    Some((latitude, longitude))
}

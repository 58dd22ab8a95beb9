#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalization of raw outbreak logbook and admin-boundary rows into
//! typed entities.
//!
//! Row-level failures follow a skip-and-count policy: a bad row is
//! excluded, logged, and tallied for the caller, but never aborts the
//! run. Structural failures (nothing left to analyze) are the analytics
//! crate's concern.

pub mod parsing;
pub mod wkb;

use outbreak_map_outbreak_models::{
    CoordinateValue, EventQuery, OutbreakEvent, RawEventRow, RawRegionRow, Region,
};
use thiserror::Error;

pub use wkb::GeometryDecodeError;

/// Row-level failure while normalizing an event row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Latitude/longitude lacked a finite numeric interpretation.
    #[error("unparseable coordinates (lat={latitude:?}, lng={longitude:?})")]
    Coordinate {
        /// The raw latitude value as received.
        latitude: String,
        /// The raw longitude value as received.
        longitude: String,
    },

    /// Reported date was not an ISO-8601 date.
    #[error("unparseable reported date {value:?}")]
    Date {
        /// The raw date string as received.
        value: String,
    },
}

/// Result of normalizing event rows: validated events plus the number of
/// rows skipped for row-level data errors.
#[derive(Debug, Clone, PartialEq)]
pub struct EventIngest {
    /// Events that survived normalization, in input order.
    pub events: Vec<OutbreakEvent>,
    /// Number of rows excluded for coordinate or date errors.
    pub skipped: u64,
}

/// A region row that failed geometry decoding, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    /// Region code of the offending row.
    pub pcode: String,
    /// Why the geometry payload could not be decoded.
    pub error: GeometryDecodeError,
}

/// Result of normalizing region rows: decodable regions plus the rows
/// excluded for geometry errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionIngest {
    /// Regions that survived decoding, in input order.
    pub regions: Vec<Region>,
    /// Rows excluded because their geometry payload was malformed.
    pub skipped: Vec<SkippedRegion>,
}

/// Normalizes one raw event row into an [`OutbreakEvent`].
///
/// # Errors
///
/// Returns [`DataError`] if the coordinates or the reported date cannot
/// be parsed.
pub fn normalize_event(row: &RawEventRow) -> Result<OutbreakEvent, DataError> {
    let (latitude, longitude) =
        parsing::parse_lat_lng(&row.latitude, &row.longitude).ok_or_else(|| {
            DataError::Coordinate {
                latitude: coordinate_repr(&row.latitude),
                longitude: coordinate_repr(&row.longitude),
            }
        })?;
    let reported_date =
        parsing::parse_reported_date(&row.reported_date).ok_or_else(|| DataError::Date {
            value: row.reported_date.clone(),
        })?;

    Ok(OutbreakEvent {
        disease: row.disease_name.clone(),
        reported_date,
        longitude,
        latitude,
    })
}

/// Normalizes all event rows, skipping and counting rows that fail.
#[must_use]
pub fn ingest_events(rows: &[RawEventRow]) -> EventIngest {
    let mut events = Vec::with_capacity(rows.len());
    let mut skipped = 0u64;

    for row in rows {
        match normalize_event(row) {
            Ok(event) => events.push(event),
            Err(error) => {
                log::warn!("Skipping event row: {error}");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::info!("Skipped {skipped} of {} event rows", rows.len());
    }

    EventIngest { events, skipped }
}

/// Applies the query-contract filter (inclusive date range, optional
/// disease) to validated events.
#[must_use]
pub fn filter_events(events: Vec<OutbreakEvent>, query: &EventQuery) -> Vec<OutbreakEvent> {
    events
        .into_iter()
        .filter(|event| query.matches(event))
        .collect()
}

/// Normalizes one raw region row, decoding its geometry payload.
///
/// # Errors
///
/// Returns [`GeometryDecodeError`] if the payload prefix, hex, or WKB
/// structure is malformed.
pub fn normalize_region(row: &RawRegionRow) -> Result<Region, GeometryDecodeError> {
    let boundary = wkb::decode_region_geometry(&row.geometry)?;
    Ok(Region {
        pcode: row.pcode.clone(),
        name: row.name.clone(),
        boundary,
    })
}

/// Normalizes all region rows, skipping rows whose geometry fails to
/// decode and reporting each offender with its reason.
#[must_use]
pub fn ingest_regions(rows: &[RawRegionRow]) -> RegionIngest {
    let mut regions = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for row in rows {
        match normalize_region(row) {
            Ok(region) => regions.push(region),
            Err(error) => {
                log::warn!("Skipping region {}: {error}", row.pcode);
                skipped.push(SkippedRegion {
                    pcode: row.pcode.clone(),
                    error,
                });
            }
        }
    }

    if !skipped.is_empty() {
        log::info!("Skipped {} of {} region rows", skipped.len(), rows.len());
    }

    RegionIngest { regions, skipped }
}

fn coordinate_repr(value: &CoordinateValue) -> String {
    match value {
        CoordinateValue::Number(n) => n.to_string(),
        CoordinateValue::Text(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use outbreak_map_outbreak_models::CoordinateValue;

    use super::*;

    fn event_row(disease: &str, date: &str, lat: CoordinateValue, lng: CoordinateValue) -> RawEventRow {
        RawEventRow {
            disease_name: disease.to_string(),
            reported_date: date.to_string(),
            latitude: lat,
            longitude: lng,
        }
    }

    fn square_geometry_hex() -> String {
        let mut wkb = vec![1u8];
        wkb.extend_from_slice(&3u32.to_le_bytes());
        wkb.extend_from_slice(&1u32.to_le_bytes());
        let ring: [(f64, f64); 5] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)];
        wkb.extend_from_slice(&u32::try_from(ring.len()).unwrap().to_le_bytes());
        for (x, y) in ring {
            wkb.extend_from_slice(&x.to_le_bytes());
            wkb.extend_from_slice(&y.to_le_bytes());
        }
        format!("0020{}", hex::encode(wkb))
    }

    #[test]
    fn ingests_events_with_skip_and_count() {
        let rows = vec![
            event_row("Anthrax", "2024-03-17", 9.0054.into(), 38.7578.into()),
            event_row("Anthrax", "2024-03-18", "bad".into(), 38.7578.into()),
            event_row("Anthrax", "17/03/2024", 9.0054.into(), 38.7578.into()),
            event_row("Rabies", "2024-04-02", "8.98".into(), "38.80".into()),
        ];

        let ingest = ingest_events(&rows);
        assert_eq!(ingest.events.len(), 2);
        assert_eq!(ingest.skipped, 2);
        assert_eq!(ingest.events[0].disease, "Anthrax");
        assert_eq!(ingest.events[1].disease, "Rabies");
    }

    #[test]
    fn normalize_event_reports_coordinate_error() {
        let row = event_row("Anthrax", "2024-03-17", "north".into(), 38.7578.into());
        assert!(matches!(
            normalize_event(&row),
            Err(DataError::Coordinate { .. })
        ));
    }

    #[test]
    fn filters_events_by_query() {
        let rows = vec![
            event_row("Anthrax", "2024-03-17", 9.0.into(), 38.7.into()),
            event_row("Rabies", "2024-03-18", 9.0.into(), 38.7.into()),
            event_row("Anthrax", "2025-01-01", 9.0.into(), 38.7.into()),
        ];
        let events = ingest_events(&rows).events;

        let query = EventQuery {
            start_date: NaiveDate::parse_from_str("2024-01-01", "%Y-%m-%d").unwrap(),
            end_date: NaiveDate::parse_from_str("2024-12-31", "%Y-%m-%d").unwrap(),
            disease: Some("Anthrax".to_string()),
        };
        let filtered = filter_events(events, &query);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].reported_date.to_string(), "2024-03-17");
    }

    #[test]
    fn ingests_regions_and_skips_truncated_geometry() {
        let good = square_geometry_hex();
        let truncated = good[..good.len() - 16].to_string();
        let rows = vec![
            RawRegionRow {
                name: "Woreda A".to_string(),
                pcode: "ET0101".to_string(),
                geometry: good,
            },
            RawRegionRow {
                name: "Woreda B".to_string(),
                pcode: "ET0102".to_string(),
                geometry: truncated,
            },
        ];

        let ingest = ingest_regions(&rows);
        assert_eq!(ingest.regions.len(), 1);
        assert_eq!(ingest.regions[0].pcode, "ET0101");
        assert_eq!(ingest.skipped.len(), 1);
        assert_eq!(ingest.skipped[0].pcode, "ET0102");
        assert!(matches!(
            ingest.skipped[0].error,
            GeometryDecodeError::Truncated { .. }
        ));
    }
}

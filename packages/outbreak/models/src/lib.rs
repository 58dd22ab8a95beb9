#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Outbreak event and administrative region entities.
//!
//! These types are the validated inputs to the hotspot pipeline. The raw
//! row types mirror the backend query contracts; the ingest crate
//! normalizes them into the typed entities defined here.

use chrono::NaiveDate;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// A single reported outbreak event, immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutbreakEvent {
    /// Disease name as reported (e.g. "Anthrax").
    pub disease: String,
    /// Date the outbreak was reported.
    pub reported_date: NaiveDate,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

/// An administrative region (woreda) with its boundary polygon.
///
/// The region set is fixed for the duration of one analysis run. Boundary
/// coordinates stay in the source CRS; no reprojection is performed, so
/// event and region coordinates must share a reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Unique, stable region code (e.g. "ET040101").
    pub pcode: String,
    /// Human-readable region name.
    pub name: String,
    /// Boundary polygon(s).
    pub boundary: MultiPolygon<f64>,
}

/// A coordinate as delivered by the backend: either a JSON number or a
/// decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateValue {
    /// Native numeric value.
    Number(f64),
    /// Decimal string value (e.g. `"9.0054"`).
    Text(String),
}

impl CoordinateValue {
    /// Coerces the value to `f64`.
    ///
    /// Returns `None` for unparseable or non-finite values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for CoordinateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CoordinateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A raw event row from the outbreak logbook query contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventRow {
    /// Disease name.
    pub disease_name: String,
    /// Reported date as an ISO-8601 date string.
    pub reported_date: String,
    /// Latitude, numeric or decimal string.
    pub latitude: CoordinateValue,
    /// Longitude, numeric or decimal string.
    pub longitude: CoordinateValue,
}

/// A raw region row from the admin-boundary query contract.
///
/// `geometry` is a hex string whose first four characters are a
/// non-payload transport prefix; the remainder hex-decodes to a WKB
/// polygon. The ingest crate validates and decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRegionRow {
    /// Human-readable region name.
    pub name: String,
    /// Unique, stable region code.
    pub pcode: String,
    /// Prefixed hex-encoded WKB boundary payload.
    pub geometry: String,
}

/// Event filter mirroring the backend query contract: an inclusive date
/// range plus an optional disease equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// First reported date included in the analysis.
    pub start_date: NaiveDate,
    /// Last reported date included in the analysis.
    pub end_date: NaiveDate,
    /// Restrict to a single disease; `None` means all diseases.
    pub disease: Option<String>,
}

impl EventQuery {
    /// Creates a query over `[start_date, end_date]` for all diseases.
    #[must_use]
    pub const fn date_range(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            disease: None,
        }
    }

    /// Returns whether `event` falls inside the date range and matches the
    /// disease filter.
    #[must_use]
    pub fn matches(&self, event: &OutbreakEvent) -> bool {
        if event.reported_date < self.start_date || event.reported_date > self.end_date {
            return false;
        }
        self.disease
            .as_ref()
            .is_none_or(|disease| *disease == event.disease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn event(disease: &str, date: &str) -> OutbreakEvent {
        OutbreakEvent {
            disease: disease.to_string(),
            reported_date: day(date),
            longitude: 39.5,
            latitude: 9.1,
        }
    }

    #[test]
    fn coerces_numeric_coordinate() {
        let value = CoordinateValue::Number(9.0054);
        assert!((value.as_f64().unwrap() - 9.0054).abs() < f64::EPSILON);
    }

    #[test]
    fn coerces_string_coordinate() {
        let value = CoordinateValue::from(" 38.7578 ");
        assert!((value.as_f64().unwrap() - 38.7578).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unparseable_coordinate() {
        assert!(CoordinateValue::from("north-ish").as_f64().is_none());
    }

    #[test]
    fn rejects_non_finite_coordinate() {
        assert!(CoordinateValue::Number(f64::NAN).as_f64().is_none());
        assert!(CoordinateValue::from("inf").as_f64().is_none());
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let query = EventQuery::date_range(day("2024-01-01"), day("2024-12-31"));
        assert!(query.matches(&event("Anthrax", "2024-01-01")));
        assert!(query.matches(&event("Anthrax", "2024-12-31")));
        assert!(!query.matches(&event("Anthrax", "2023-12-31")));
        assert!(!query.matches(&event("Anthrax", "2025-01-01")));
    }

    #[test]
    fn disease_filter_is_exact_equality() {
        let query = EventQuery {
            start_date: day("2024-01-01"),
            end_date: day("2024-12-31"),
            disease: Some("Rabies".to_string()),
        };
        assert!(query.matches(&event("Rabies", "2024-06-01")));
        assert!(!query.matches(&event("Anthrax", "2024-06-01")));
    }
}

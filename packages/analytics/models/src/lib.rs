#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot analysis result types, the cluster quadrant taxonomy, and the
//! render contract consumed by presentation adapters.
//!
//! The core pipeline produces these types; map rendering, layer
//! lifecycle, and styling live entirely outside the core and consume the
//! fixed label/color table defined on [`Quadrant`].

use geo::MultiPolygon;
use outbreak_map_outbreak_models::Region;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default pseudo p-value threshold below which a region counts as
/// significant.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Default number of conditional permutations per region.
pub const DEFAULT_PERMUTATIONS: u32 = 999;

/// Default vertex snapping tolerance (coordinate units) for contiguity
/// detection.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 1e-9;

/// Fill opacity presentation adapters apply to cluster layers.
pub const FILL_OPACITY: f64 = 0.7;

/// Cluster quadrant: the sign of a region's standardized count paired
/// with the sign of its neighbors' weighted average.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Quadrant {
    /// High value surrounded by high neighbors (hotspot core).
    #[serde(rename = "HH")]
    #[strum(serialize = "HH")]
    HighHigh,
    /// Low value surrounded by high neighbors (outlier).
    #[serde(rename = "LH")]
    #[strum(serialize = "LH")]
    LowHigh,
    /// Low value surrounded by low neighbors (cold spot core).
    #[serde(rename = "LL")]
    #[strum(serialize = "LL")]
    LowLow,
    /// High value surrounded by low neighbors (outlier).
    #[serde(rename = "HL")]
    #[strum(serialize = "HL")]
    HighLow,
}

impl Quadrant {
    /// Classifies from the sign of the standardized value and the sign of
    /// its spatial lag. Zero counts as "low" on either axis: only a
    /// strictly positive deviation is "high".
    #[must_use]
    pub const fn from_signs(value_is_high: bool, lag_is_high: bool) -> Self {
        match (value_is_high, lag_is_high) {
            (true, true) => Self::HighHigh,
            (false, true) => Self::LowHigh,
            (false, false) => Self::LowLow,
            (true, false) => Self::HighLow,
        }
    }

    /// Human-readable legend label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighHigh => "High-High (Hotspot)",
            Self::LowHigh => "Low-High (Outlier)",
            Self::LowLow => "Low-Low (Cold Spot)",
            Self::HighLow => "High-Low (Outlier)",
        }
    }

    /// Fill color (hex) for map symbology.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::HighHigh => "#d7191c",
            Self::LowHigh => "#fdae61",
            Self::LowLow => "#2c7bb6",
            Self::HighLow => "#abd9e9",
        }
    }

    /// Numeric renderer category code (1-4), in legend order.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::HighHigh => 1,
            Self::LowHigh => 2,
            Self::LowLow => 3,
            Self::HighLow => 4,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::HighHigh, Self::LowHigh, Self::LowLow, Self::HighLow]
    }
}

/// Per-region local autocorrelation result. Derived, recomputed per run,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStatistic {
    /// Region code.
    pub pcode: String,
    /// Local Moran's I.
    pub moran_i: f64,
    /// Quadrant classification.
    pub quadrant: Quadrant,
    /// Permutation pseudo p-value, in `[1/(permutations+1), 1]`.
    pub p_value: f64,
}

/// A statistically significant cluster region: the local statistic joined
/// with the region's identity, geometry, and event count.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificantCluster {
    /// Region code.
    pub pcode: String,
    /// Region name.
    pub name: String,
    /// Region boundary.
    pub boundary: MultiPolygon<f64>,
    /// Aggregated event count.
    pub count: u64,
    /// Local Moran's I.
    pub moran_i: f64,
    /// Quadrant classification.
    pub quadrant: Quadrant,
    /// Permutation pseudo p-value.
    pub p_value: f64,
}

/// One renderable cluster feature for the presentation adapter, with the
/// boundary as GeoJSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFeature {
    /// Region code.
    pub pcode: String,
    /// Region boundary as a GeoJSON geometry.
    pub geometry: geojson::Geometry,
    /// Aggregated event count.
    pub count: u64,
    /// Quadrant classification; label and color come from the fixed
    /// [`Quadrant`] table.
    pub quadrant: Quadrant,
    /// Permutation pseudo p-value.
    pub p_value: f64,
}

impl From<&SignificantCluster> for RenderFeature {
    fn from(cluster: &SignificantCluster) -> Self {
        Self {
            pcode: cluster.pcode.clone(),
            geometry: geojson::Geometry::new(geojson::Value::from(&cluster.boundary)),
            count: cluster.count,
            quadrant: cluster.quadrant,
            p_value: cluster.p_value,
        }
    }
}

/// Configuration for one analysis run.
///
/// The permutation seed is deliberately required: identical inputs plus
/// an identical seed reproduce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Pseudo p-value threshold for cluster significance.
    pub significance_threshold: f64,
    /// Number of conditional permutations per region.
    pub permutations: u32,
    /// Seed for the permutation sampler; per-region sub-seeds derive from
    /// it deterministically.
    pub seed: u64,
    /// Vertex snapping tolerance for contiguity detection.
    pub snap_tolerance: f64,
}

impl AnalysisOptions {
    /// Creates options with the documented defaults and the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            permutations: DEFAULT_PERMUTATIONS,
            seed,
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
        }
    }
}

/// Per-run bookkeeping surfaced alongside the cluster set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDiagnostics {
    /// Events entering aggregation after filtering.
    pub total_events: u64,
    /// Events attributed to a region.
    pub matched_events: u64,
    /// Events matching no region.
    pub unmatched_events: u64,
    /// Event rows excluded during ingestion for data errors.
    pub skipped_event_rows: u64,
    /// Region rows excluded during ingestion for geometry errors.
    pub skipped_region_rows: u64,
    /// Regions that entered the analysis.
    pub region_count: u64,
    /// Regions with no contiguity neighbors.
    pub isolate_count: u64,
}

/// Everything one analysis run produces.
///
/// An empty `clusters` list is a valid outcome ("no clusters found"),
/// distinct from every error.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// Significant clusters, ordered by region code.
    pub clusters: Vec<SignificantCluster>,
    /// Render-contract features for the clusters, in the same order.
    pub features: Vec<RenderFeature>,
    /// Local statistics for every analyzed region, in region input order.
    pub statistics: Vec<LocalStatistic>,
    /// Run bookkeeping.
    pub diagnostics: AnalysisDiagnostics,
}

/// Builds the full region set for a cluster row.
///
/// Convenience for presentation adapters joining back to [`Region`]
/// metadata they already hold.
#[must_use]
pub fn cluster_from_region(
    region: &Region,
    count: u64,
    statistic: &LocalStatistic,
) -> SignificantCluster {
    SignificantCluster {
        pcode: region.pcode.clone(),
        name: region.name.clone(),
        boundary: region.boundary.clone(),
        count,
        moran_i: statistic.moran_i,
        quadrant: statistic.quadrant,
        p_value: statistic.p_value,
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local spatial-autocorrelation hotspot analysis over outbreak events.
//!
//! [`analyze`] runs the core pipeline: aggregate events into regions,
//! build queen contiguity weights, compute Local Moran's I with
//! conditional-permutation significance, and classify significant
//! clusters. The pipeline is synchronous, single-threaded, and stateless
//! per invocation: identical inputs with an identical seed reproduce
//! identical output.

pub mod cluster;
pub mod moran;
pub mod progress;

use std::sync::Arc;

use outbreak_map_analytics_models::{AnalysisDiagnostics, AnalysisOptions, AnalysisOutcome};
use outbreak_map_outbreak_models::{EventQuery, OutbreakEvent, RawEventRow, RawRegionRow, Region};
use outbreak_map_spatial::RegionIndex;
use outbreak_map_spatial::contiguity::{ContiguityGraph, SpatialWeights};
use thiserror::Error;

use crate::progress::{CancelToken, ProgressCallback};

/// Errors that abort an analysis run.
///
/// Row-level data problems never surface here: they are skipped and
/// counted during ingestion. These are structural failures where any
/// statistic would be misleading, plus cooperative cancellation. An
/// empty cluster result is a success, not an error.
#[derive(Debug, Error)]
pub enum HotspotError {
    /// No events remained after filtering, or no decodable regions were
    /// supplied.
    #[error("no outbreak events or regions left to analyze")]
    EmptyInput,

    /// Region counts have zero variance, so standardization is
    /// undefined for every region.
    #[error("region counts have zero variance; local statistics are undefined")]
    DegenerateData,

    /// An internal invariant was violated.
    #[error("computation invariant violated: {message}")]
    Computation {
        /// What went wrong.
        message: String,
    },

    /// The caller's cancellation token fired.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Runs the full analysis over validated events and regions.
///
/// # Errors
///
/// Returns [`HotspotError::EmptyInput`] when either input is empty,
/// [`HotspotError::DegenerateData`] when every region has the same
/// count, [`HotspotError::Computation`] on an internal invariant
/// violation, and [`HotspotError::Cancelled`] when `cancel` fires.
pub fn analyze(
    events: &[OutbreakEvent],
    regions: &[Region],
    options: &AnalysisOptions,
    progress: Option<Arc<dyn ProgressCallback>>,
    cancel: Option<&CancelToken>,
) -> Result<AnalysisOutcome, HotspotError> {
    if events.is_empty() || regions.is_empty() {
        return Err(HotspotError::EmptyInput);
    }

    stage(progress.as_deref(), "Aggregating events");
    check_cancel(cancel)?;
    let index = RegionIndex::build(regions);
    let counts = index.aggregate(events);
    log::info!(
        "Aggregated {} events into {} regions ({} unmatched)",
        events.len(),
        regions.len(),
        counts.unmatched
    );

    stage(progress.as_deref(), "Building contiguity weights");
    check_cancel(cancel)?;
    let graph = ContiguityGraph::queen(regions, options.snap_tolerance);
    let weights = SpatialWeights::row_standardized(&graph);

    stage(progress.as_deref(), "Computing local statistics");
    if let Some(reporter) = progress.as_deref() {
        reporter.set_total(regions.len() as u64);
    }
    let z = moran::standardize(&counts.counts)?;
    let stats = moran::local_moran(
        &z,
        &weights,
        options.permutations,
        options.seed,
        progress.as_deref(),
        cancel,
    )?;
    let statistics = cluster::local_statistics(regions, &stats);

    stage(progress.as_deref(), "Classifying clusters");
    check_cancel(cancel)?;
    let clusters =
        cluster::significant_clusters(regions, &counts, &statistics, options.significance_threshold);
    let features = cluster::render_features(&clusters);

    if clusters.is_empty() {
        log::info!("No significant clusters found");
    } else {
        log::info!("Found {} significant clusters", clusters.len());
    }
    if let Some(reporter) = progress.as_deref() {
        reporter.finish(format!("{} significant clusters", clusters.len()));
    }

    let diagnostics = AnalysisDiagnostics {
        total_events: events.len() as u64,
        matched_events: counts.matched(),
        unmatched_events: counts.unmatched,
        skipped_event_rows: 0,
        skipped_region_rows: 0,
        region_count: regions.len() as u64,
        isolate_count: graph.isolate_count() as u64,
    };

    Ok(AnalysisOutcome {
        clusters,
        features,
        statistics,
        diagnostics,
    })
}

/// Front door for raw query-contract rows: normalizes and filters them
/// with the skip-and-count policy, then runs [`analyze`], surfacing the
/// skip tallies in the outcome diagnostics.
///
/// # Errors
///
/// As [`analyze`]; rows dropped during normalization only become an
/// error when nothing is left to analyze.
pub fn analyze_rows(
    event_rows: &[RawEventRow],
    region_rows: &[RawRegionRow],
    query: &EventQuery,
    options: &AnalysisOptions,
    progress: Option<Arc<dyn ProgressCallback>>,
    cancel: Option<&CancelToken>,
) -> Result<AnalysisOutcome, HotspotError> {
    stage(progress.as_deref(), "Normalizing input rows");
    check_cancel(cancel)?;

    let event_ingest = outbreak_map_ingest::ingest_events(event_rows);
    let events = outbreak_map_ingest::filter_events(event_ingest.events, query);
    let region_ingest = outbreak_map_ingest::ingest_regions(region_rows);

    let mut outcome = analyze(&events, &region_ingest.regions, options, progress, cancel)?;
    outcome.diagnostics.skipped_event_rows = event_ingest.skipped;
    outcome.diagnostics.skipped_region_rows = region_ingest.skipped.len() as u64;
    Ok(outcome)
}

fn stage(progress: Option<&dyn ProgressCallback>, message: &str) {
    log::info!("{message}");
    if let Some(reporter) = progress {
        reporter.set_message(message.to_string());
    }
}

fn check_cancel(cancel: Option<&CancelToken>) -> Result<(), HotspotError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(HotspotError::Cancelled),
        _ => Ok(()),
    }
}

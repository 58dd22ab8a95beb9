#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index and event aggregation over admin regions.
//!
//! Builds an R-tree over region bounding boxes for fast point-in-region
//! attribution, counts outbreak events per region, and derives the queen
//! contiguity graph and row-standardized weights consumed by the local
//! autocorrelation engine.

pub mod contiguity;

use geo::{BoundingRect, Intersects, MultiPolygon};
use outbreak_map_outbreak_models::{OutbreakEvent, Region};
use rstar::{AABB, RTree, RTreeObject};

/// A region stored in the R-tree with its position in the input order.
struct IndexEntry<'a> {
    ordinal: usize,
    region: &'a Region,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Event counts per region, zero-filled, plus the number of events that
/// fell inside no region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCounts {
    /// Count per region, indexed by region ordinal (input order). Every
    /// region appears, defaulting to 0.
    pub counts: Vec<u64>,
    /// Events that matched no region.
    pub unmatched: u64,
}

impl RegionCounts {
    /// Total events that were attributed to some region.
    #[must_use]
    pub fn matched(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Pre-built R-tree index over region boundaries.
///
/// Constructed once per analysis run and used for point-in-region
/// attribution.
pub struct RegionIndex<'a> {
    tree: RTree<IndexEntry<'a>>,
    region_count: usize,
}

impl<'a> RegionIndex<'a> {
    /// Builds the index over `regions`, preserving input order as the
    /// ordinal used everywhere downstream.
    #[must_use]
    pub fn build(regions: &'a [Region]) -> Self {
        let entries = regions
            .iter()
            .enumerate()
            .map(|(ordinal, region)| IndexEntry {
                ordinal,
                region,
                envelope: envelope_of(&region.boundary),
            })
            .collect();

        log::debug!("Built region index over {} regions", regions.len());

        Self {
            tree: RTree::bulk_load(entries),
            region_count: regions.len(),
        }
    }

    /// Number of indexed regions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.region_count
    }

    /// Returns whether the index is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.region_count == 0
    }

    /// Finds the region containing the point, boundary-inclusive: a point
    /// exactly on a boundary matches. When a boundary point touches
    /// several regions, the lowest ordinal (first in input order) wins, so
    /// an event is never attributed twice.
    #[must_use]
    pub fn locate(&self, longitude: f64, latitude: f64) -> Option<usize> {
        let point = geo::Point::new(longitude, latitude);
        let query = AABB::from_point([longitude, latitude]);

        self.tree
            .locate_in_envelope_intersecting(&query)
            .filter(|entry| entry.region.boundary.intersects(&point))
            .map(|entry| entry.ordinal)
            .min()
    }

    /// Counts events per region. Events matching no region are dropped
    /// and counted as unmatched, so
    /// `counts.matched() + counts.unmatched == events.len()` always holds.
    #[must_use]
    pub fn aggregate(&self, events: &[OutbreakEvent]) -> RegionCounts {
        let mut counts = vec![0u64; self.region_count];
        let mut unmatched = 0u64;

        for event in events {
            match self.locate(event.longitude, event.latitude) {
                Some(ordinal) => counts[ordinal] += 1,
                None => unmatched += 1,
            }
        }

        if unmatched > 0 {
            log::info!("{unmatched} of {} events matched no region", events.len());
        }

        RegionCounts { counts, unmatched }
    }
}

/// Computes the bounding box envelope for a region boundary.
fn envelope_of(boundary: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    boundary.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

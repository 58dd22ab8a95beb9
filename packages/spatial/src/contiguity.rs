//! Queen contiguity graph and row-standardized spatial weights.
//!
//! Two regions are neighbors when their boundaries share any edge or
//! vertex. Candidate pairs come from an R-tree over tolerance-expanded
//! bounding boxes; the pair test combines an exact boundary-intersection
//! predicate with vertex matching on a snapping grid, which catches the
//! floating-point near-touch seams the exact predicate misses. The
//! snapping tolerance is caller-visible configuration: differing
//! tolerances change the graph and therefore the cluster results.

use std::collections::{BTreeSet, HashSet};

use geo::{BoundingRect, Coord, Intersects, MultiPolygon};
use outbreak_map_outbreak_models::Region;
use rstar::{AABB, RTree, RTreeObject};

struct BoundaryEntry {
    ordinal: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Undirected region adjacency under queen contiguity.
///
/// Nodes are region ordinals (input order); neighbor lists are sorted and
/// contain no self-edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContiguityGraph {
    neighbors: Vec<Vec<usize>>,
}

impl ContiguityGraph {
    /// Builds the queen contiguity graph over `regions`.
    ///
    /// `snap_tolerance` is the vertex snapping grid size in coordinate
    /// units; `0.0` disables snapping and matches vertices bit-exactly.
    #[must_use]
    pub fn queen(regions: &[Region], snap_tolerance: f64) -> Self {
        let snapped: Vec<HashSet<(i64, i64)>> = regions
            .iter()
            .map(|region| snapped_vertices(&region.boundary, snap_tolerance))
            .collect();

        let entries = regions
            .iter()
            .enumerate()
            .map(|(ordinal, region)| BoundaryEntry {
                ordinal,
                envelope: expanded_envelope(&region.boundary, snap_tolerance),
            })
            .collect();
        let tree: RTree<BoundaryEntry> = RTree::bulk_load(entries);

        let mut neighbor_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); regions.len()];
        for (i, region) in regions.iter().enumerate() {
            let query = expanded_envelope(&region.boundary, snap_tolerance);
            for candidate in tree.locate_in_envelope_intersecting(&query) {
                let j = candidate.ordinal;
                if j <= i {
                    continue;
                }
                if touches(&region.boundary, &regions[j].boundary, &snapped[i], &snapped[j]) {
                    neighbor_sets[i].insert(j);
                    neighbor_sets[j].insert(i);
                }
            }
        }

        let neighbors: Vec<Vec<usize>> = neighbor_sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();

        let edge_count: usize = neighbors.iter().map(Vec::len).sum::<usize>() / 2;
        log::debug!(
            "Queen contiguity: {} regions, {edge_count} edges, {} isolates",
            regions.len(),
            neighbors.iter().filter(|n| n.is_empty()).count()
        );

        Self { neighbors }
    }

    /// Builds a graph from explicit neighbor lists, symmetrizing edges,
    /// dropping self-edges, and sorting each list. For callers that
    /// already hold an adjacency structure.
    #[must_use]
    pub fn from_neighbors(lists: Vec<Vec<usize>>) -> Self {
        let mut neighbor_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); lists.len()];
        for (i, list) in lists.iter().enumerate() {
            for &j in list {
                if j == i || j >= lists.len() {
                    continue;
                }
                neighbor_sets[i].insert(j);
                neighbor_sets[j].insert(i);
            }
        }
        Self {
            neighbors: neighbor_sets
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        }
    }

    /// Number of regions in the graph.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns whether the graph has no regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Sorted neighbor ordinals of region `i`.
    #[must_use]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    /// Neighbor count of region `i`.
    #[must_use]
    pub fn degree(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    /// Number of regions with no neighbors.
    #[must_use]
    pub fn isolate_count(&self) -> usize {
        self.neighbors.iter().filter(|n| n.is_empty()).count()
    }
}

/// Row-standardized ("r" transform) spatial weights.
///
/// Each non-isolate row weights its neighbors equally at `1/degree`, so
/// the row sums to 1. An isolate keeps an all-zero row: a legitimate
/// state that forces the region's spatial lag, and therefore its local
/// statistic, to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWeights {
    neighbors: Vec<Vec<usize>>,
    weights: Vec<Vec<f64>>,
}

impl SpatialWeights {
    /// Derives row-standardized weights from a contiguity graph.
    #[must_use]
    pub fn row_standardized(graph: &ContiguityGraph) -> Self {
        let neighbors: Vec<Vec<usize>> = (0..graph.len())
            .map(|i| graph.neighbors(i).to_vec())
            .collect();
        let weights = neighbors
            .iter()
            .map(|row| {
                #[allow(clippy::cast_precision_loss)]
                let weight = if row.is_empty() {
                    0.0
                } else {
                    1.0 / row.len() as f64
                };
                vec![weight; row.len()]
            })
            .collect();

        Self { neighbors, weights }
    }

    /// Number of regions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns whether there are no regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbor ordinals and aligned weights for region `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        (&self.neighbors[i], &self.weights[i])
    }

    /// Neighbor count of region `i`.
    #[must_use]
    pub fn degree(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    /// Returns whether region `i` has no neighbors.
    #[must_use]
    pub fn is_isolate(&self, i: usize) -> bool {
        self.neighbors[i].is_empty()
    }

    /// Sum of row `i`: 1 for non-isolates, 0 for isolates, up to
    /// floating-point tolerance.
    #[must_use]
    pub fn row_sum(&self, i: usize) -> f64 {
        self.weights[i].iter().sum()
    }

    /// Spatial lag of `values` at region `i`: `Σ_j w_ij * values[j]`.
    #[must_use]
    pub fn spatial_lag(&self, i: usize, values: &[f64]) -> f64 {
        self.neighbors[i]
            .iter()
            .zip(&self.weights[i])
            .map(|(&j, &w)| w * values[j])
            .sum()
    }
}

fn touches(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
    a_vertices: &HashSet<(i64, i64)>,
    b_vertices: &HashSet<(i64, i64)>,
) -> bool {
    let (small, large) = if a_vertices.len() <= b_vertices.len() {
        (a_vertices, b_vertices)
    } else {
        (b_vertices, a_vertices)
    };
    if small.iter().any(|vertex| large.contains(vertex)) {
        return true;
    }
    a.intersects(b)
}

fn snapped_vertices(boundary: &MultiPolygon<f64>, tolerance: f64) -> HashSet<(i64, i64)> {
    let mut vertices = HashSet::new();
    for polygon in &boundary.0 {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
        for ring in rings {
            for coord in &ring.0 {
                vertices.insert(snap(coord, tolerance));
            }
        }
    }
    vertices
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn snap(coord: &Coord<f64>, tolerance: f64) -> (i64, i64) {
    if tolerance > 0.0 {
        (
            (coord.x / tolerance).round() as i64,
            (coord.y / tolerance).round() as i64,
        )
    } else {
        (coord.x.to_bits() as i64, coord.y.to_bits() as i64)
    }
}

fn expanded_envelope(boundary: &MultiPolygon<f64>, tolerance: f64) -> AABB<[f64; 2]> {
    boundary.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| {
            AABB::from_corners(
                [rect.min().x - tolerance, rect.min().y - tolerance],
                [rect.max().x + tolerance, rect.max().y + tolerance],
            )
        },
    )
}

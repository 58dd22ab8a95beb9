//! Significant-cluster selection and render-contract assembly.

use outbreak_map_analytics_models::{
    LocalStatistic, RenderFeature, SignificantCluster, cluster_from_region,
};
use outbreak_map_outbreak_models::Region;
use outbreak_map_spatial::RegionCounts;

use crate::moran::RegionStatistic;

/// Joins per-region statistics with region identity, in region input
/// order.
#[must_use]
pub fn local_statistics(regions: &[Region], stats: &[RegionStatistic]) -> Vec<LocalStatistic> {
    regions
        .iter()
        .zip(stats)
        .map(|(region, stat)| LocalStatistic {
            pcode: region.pcode.clone(),
            moran_i: stat.moran_i,
            quadrant: stat.quadrant,
            p_value: stat.p_value,
        })
        .collect()
}

/// Filters to regions significant at `significance_threshold` with a
/// non-zero event count, ordered by region code.
///
/// The count guard keeps sparse data from declaring zero-activity
/// regions significant. An empty result is a valid outcome.
#[must_use]
pub fn significant_clusters(
    regions: &[Region],
    counts: &RegionCounts,
    statistics: &[LocalStatistic],
    significance_threshold: f64,
) -> Vec<SignificantCluster> {
    let mut clusters: Vec<SignificantCluster> = regions
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            statistics[*i].p_value < significance_threshold && counts.counts[*i] > 0
        })
        .map(|(i, region)| cluster_from_region(region, counts.counts[i], &statistics[i]))
        .collect();

    clusters.sort_by(|a, b| a.pcode.cmp(&b.pcode));
    clusters
}

/// Render-contract features for an ordered cluster list.
#[must_use]
pub fn render_features(clusters: &[SignificantCluster]) -> Vec<RenderFeature> {
    clusters.iter().map(RenderFeature::from).collect()
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use outbreak_map_analytics_models::Quadrant;

    use super::*;

    fn region(pcode: &str) -> Region {
        let ring = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        Region {
            pcode: pcode.to_string(),
            name: format!("Woreda {pcode}"),
            boundary: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn statistic(pcode: &str, p_value: f64) -> LocalStatistic {
        LocalStatistic {
            pcode: pcode.to_string(),
            moran_i: 1.0,
            quadrant: Quadrant::HighHigh,
            p_value,
        }
    }

    #[test]
    fn filters_by_threshold_and_count() {
        let regions = vec![region("ET03"), region("ET01"), region("ET02")];
        let counts = RegionCounts {
            counts: vec![4, 9, 0],
            unmatched: 0,
        };
        let statistics = vec![
            statistic("ET03", 0.01),
            statistic("ET01", 0.20),
            statistic("ET02", 0.01),
        ];

        let clusters = significant_clusters(&regions, &counts, &statistics, 0.05);

        // ET01 fails the threshold, ET02 fails the count guard.
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].pcode, "ET03");
        assert_eq!(clusters[0].count, 4);
    }

    #[test]
    fn orders_clusters_by_pcode() {
        let regions = vec![region("ET03"), region("ET01"), region("ET02")];
        let counts = RegionCounts {
            counts: vec![4, 9, 2],
            unmatched: 0,
        };
        let statistics = vec![
            statistic("ET03", 0.01),
            statistic("ET01", 0.01),
            statistic("ET02", 0.01),
        ];

        let clusters = significant_clusters(&regions, &counts, &statistics, 0.05);
        let pcodes: Vec<&str> = clusters.iter().map(|c| c.pcode.as_str()).collect();
        assert_eq!(pcodes, vec!["ET01", "ET02", "ET03"]);
    }

    #[test]
    fn empty_cluster_set_is_valid() {
        let regions = vec![region("ET01")];
        let counts = RegionCounts {
            counts: vec![3],
            unmatched: 0,
        };
        let statistics = vec![statistic("ET01", 0.80)];

        let clusters = significant_clusters(&regions, &counts, &statistics, 0.05);
        assert!(clusters.is_empty());
        assert!(render_features(&clusters).is_empty());
    }
}

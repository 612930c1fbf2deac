//! Spatial weights graph construction
//!
//! Turns the normalized geographic features into a neighbor graph with
//! row-stochastic inverse-distance weights: regions within the configured
//! threshold of each other become neighbors, closer neighbors weigh more,
//! and each region's weights are normalized to sum to 1.0. The graph is a
//! proxy for spatial interaction potential and feeds market clustering.

pub mod distance;

pub use distance::haversine_km;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::types::{GeoFeature, LatLng, RegionId, SpatialWeightEntry, SpatialWeights};

/// Builds the distance-thresholded, row-normalized spatial weights graph.
///
/// The pairwise pass is O(R²) over regions. That is fine for the
/// administrative-region counts this system handles; swapping in a spatial
/// index would have to preserve the threshold-and-normalize semantics
/// exactly.
#[derive(Debug, Clone)]
pub struct SpatialWeightsBuilder {
    threshold_km: f64,
}

impl SpatialWeightsBuilder {
    /// A builder linking regions whose centroids are at most `threshold_km`
    /// apart (inclusive).
    pub fn new(threshold_km: f64) -> Self {
        Self { threshold_km }
    }

    pub fn threshold_km(&self) -> f64 {
        self.threshold_km
    }

    /// Construct the weights graph for `features`.
    ///
    /// Every distinct region id gets an entry, including regions that end
    /// up with no neighbors (an isolated region is a valid state, not an
    /// error). Features with an empty region id are skipped; when the same
    /// region appears more than once, the last feature's centroid wins.
    /// Edges are directional: each region's neighbor list is built on its
    /// own, so an irregular input can in principle produce an asymmetric
    /// graph, though real data is symmetric.
    pub fn build(&self, features: &[GeoFeature]) -> SpatialWeights {
        let mut centroids: BTreeMap<RegionId, LatLng> = BTreeMap::new();
        for feature in features {
            if feature.region_id.as_str().is_empty() {
                debug!("skipping feature without a region id");
                continue;
            }
            centroids.insert(feature.region_id.clone(), feature.centroid);
        }

        let mut weights = SpatialWeights::new();
        for (region_a, centroid_a) in &centroids {
            let mut entry = SpatialWeightEntry::empty(region_a.clone());

            for (region_b, centroid_b) in &centroids {
                if region_a == region_b {
                    continue;
                }
                let km = haversine_km(*centroid_a, *centroid_b);
                if km > self.threshold_km {
                    continue;
                }
                if km == 0.0 {
                    // Distinct regions sharing a centroid have no finite
                    // inverse-distance weight; drop the pair.
                    warn!(a = %region_a, b = %region_b, "coincident centroids, pair skipped");
                    continue;
                }
                entry.neighbors.push(region_b.clone());
                entry.weights.push(1.0 / km);
            }

            // Row-normalize so non-empty rows sum to 1.0.
            let total: f64 = entry.weights.iter().sum();
            if total > 0.0 {
                for weight in &mut entry.weights {
                    *weight /= total;
                }
            }

            weights.insert(region_a.clone(), entry);
        }

        debug!(
            regions = weights.len(),
            threshold_km = self.threshold_km,
            "spatial weights built"
        );
        weights
    }
}

//! Market cluster identification over the spatial weights graph
//!
//! Clustering runs in three phases. Phase one walks the neighbor graph and
//! collects connected components, discarding those below the configured
//! size floor. Phase two refines each component against the flow records:
//! every flow touching a member is retained (boundary-crossing flows
//! included) and the member with the highest combined in/out volume becomes
//! the main market. Phase three attaches metrics and orders the clusters by
//! composite importance, most important first.

mod metrics;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::types::{FlowRecord, MarketCluster, RegionId, SpatialWeights};

/// Identifies coherent market groupings from spatial adjacency and trade
/// flow evidence.
#[derive(Debug, Clone)]
pub struct ClusteringEngine {
    min_cluster_size: usize,
}

impl ClusteringEngine {
    pub fn new(min_cluster_size: usize) -> Self {
        Self { min_cluster_size }
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Run all three phases and return ranked clusters.
    ///
    /// Empty weights or empty flows short-circuit to an empty list; there
    /// is nothing to group in the first case and nothing to rank clusters
    /// by in the second.
    pub fn identify_clusters(
        &self,
        weights: &SpatialWeights,
        flows: &[FlowRecord],
    ) -> Vec<MarketCluster> {
        if weights.is_empty() || flows.is_empty() {
            debug!("no weights or no flows, skipping clustering");
            return Vec::new();
        }

        let components = self.connected_components(weights);
        debug!(
            components = components.len(),
            min_size = self.min_cluster_size,
            "component discovery complete"
        );

        let mut clusters: Vec<MarketCluster> = components
            .into_iter()
            .map(|markets| self.refine(markets, flows, weights.len()))
            .collect();

        clusters.sort_by(|a, b| {
            metrics::ranking_score(&b.metrics)
                .total_cmp(&metrics::ranking_score(&a.metrics))
                .then_with(|| a.main_market.cmp(&b.main_market))
        });

        info!(clusters = clusters.len(), "clustering complete");
        clusters
    }

    /// Phase one: connected components of the neighbor graph, at least
    /// `min_cluster_size` members each.
    ///
    /// Regions join a component through the weight entries keyed on them;
    /// a neighbor id with no entry of its own is treated as outside the
    /// graph and never becomes a member. Traversal is an explicit stack
    /// walk over the keys in sorted order, so membership order is
    /// deterministic for a given input.
    fn connected_components(&self, weights: &SpatialWeights) -> Vec<Vec<RegionId>> {
        let mut visited: HashSet<&RegionId> = HashSet::with_capacity(weights.len());
        let mut components = Vec::new();

        for start in weights.keys() {
            if visited.contains(start) {
                continue;
            }
            visited.insert(start);

            let mut members = Vec::new();
            let mut stack = vec![start];
            while let Some(region) = stack.pop() {
                members.push(region.clone());
                if let Some(entry) = weights.get(region) {
                    for neighbor in &entry.neighbors {
                        if !weights.contains_key(neighbor) {
                            continue;
                        }
                        if visited.insert(neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }

            if members.len() >= self.min_cluster_size {
                components.push(members);
            } else {
                debug!(
                    seed = %members[0],
                    size = members.len(),
                    "component below size floor, discarded"
                );
            }
        }

        components
    }

    /// Phase two and three for a single component: retain its flows, score
    /// its markets, elect the main market, and attach metrics.
    ///
    /// The importance score of a market is the sum of `flow_weight` over
    /// every retained flow it appears in, as source or target. Ties for
    /// main market break toward the market discovered first in phase one.
    fn refine(
        &self,
        markets: Vec<RegionId>,
        flows: &[FlowRecord],
        total_regions: usize,
    ) -> MarketCluster {
        let members: HashSet<&RegionId> = markets.iter().collect();
        let cluster_flows: Vec<FlowRecord> = flows
            .iter()
            .filter(|flow| members.contains(&flow.source) || members.contains(&flow.target))
            .cloned()
            .collect();

        let mut importance: BTreeMap<RegionId, f64> =
            markets.iter().map(|m| (m.clone(), 0.0)).collect();
        for flow in &cluster_flows {
            if let Some(score) = importance.get_mut(&flow.source) {
                *score += flow.flow_weight;
            }
            if let Some(score) = importance.get_mut(&flow.target) {
                *score += flow.flow_weight;
            }
        }

        // Components always carry their seed, so markets is non-empty.
        let mut main_market = markets[0].clone();
        let mut best = importance.get(&main_market).copied().unwrap_or(0.0);
        for market in &markets[1..] {
            let score = importance.get(market).copied().unwrap_or(0.0);
            if score > best {
                best = score;
                main_market = market.clone();
            }
        }

        debug!(
            main_market = %main_market,
            members = markets.len(),
            flows = cluster_flows.len(),
            "cluster refined"
        );

        let metrics = metrics::compute(&markets, &cluster_flows, importance, total_regions);
        MarketCluster {
            markets,
            main_market,
            flows: cluster_flows,
            metrics,
        }
    }
}

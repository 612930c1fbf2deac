//! Derived measurements for refined market clusters

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::types::{ClusterMetrics, FlowRecord, PriceIntegration, RegionId};

/// Compute the full metric set for one cluster.
///
/// `flows` is the cluster's retained flow list, boundary-crossing flows
/// included; `importance` is the per-market combined in/out volume built
/// during refinement; `total_regions` is the size of the whole weights
/// graph (denominator of `relative_size`).
pub(crate) fn compute(
    markets: &[RegionId],
    flows: &[FlowRecord],
    importance: BTreeMap<RegionId, f64>,
    total_regions: usize,
) -> ClusterMetrics {
    let size = markets.len();
    let members: HashSet<&RegionId> = markets.iter().collect();

    let total_flow: f64 = flows.iter().map(|f| f.flow_weight).sum();
    let avg_flow = if size > 0 { total_flow / size as f64 } else { 0.0 };

    let mut internal = 0usize;
    let mut external = 0usize;
    for flow in flows {
        let source_in = members.contains(&flow.source);
        let target_in = members.contains(&flow.target);
        if source_in && target_in {
            internal += 1;
        } else if source_in || target_in {
            external += 1;
        }
    }

    // Directed pair count; clusters of one market have no pairs. Boundary
    // flows stay in the numerator, so density is not capped at 1.
    let pair_count = size.saturating_mul(size.saturating_sub(1));
    let density = if pair_count > 0 {
        flows.len() as f64 / pair_count as f64
    } else {
        0.0
    };

    let internal_flow_ratio = if flows.is_empty() {
        0.0
    } else {
        internal as f64 / flows.len() as f64
    };

    let relative_size = if total_regions > 0 {
        size as f64 / total_regions as f64
    } else {
        0.0
    };

    ClusterMetrics {
        size,
        total_flow,
        avg_flow,
        density,
        internal_flow_ratio,
        external_connections: external,
        market_importance: importance,
        price_integration: price_integration(flows),
        relative_size,
    }
}

/// Mean and population standard deviation of the normalized absolute price
/// gap `|source - target| / mid` over flows carrying both prices. Flows
/// with a zero mid price are skipped; no qualifying flows yields zeros.
fn price_integration(flows: &[FlowRecord]) -> PriceIntegration {
    let mut gaps = Vec::new();
    for flow in flows {
        if let (Some(source), Some(target)) = (flow.source_price, flow.target_price) {
            let mid = (source + target) / 2.0;
            if mid != 0.0 {
                gaps.push((source - target).abs() / mid);
            }
        }
    }

    if gaps.is_empty() {
        return PriceIntegration::default();
    }

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;

    PriceIntegration {
        mean,
        std: variance.sqrt(),
    }
}

/// Composite importance used to rank clusters, larger first: volume
/// dominates, then membership size, then density, then outward reach.
pub(crate) fn ranking_score(metrics: &ClusterMetrics) -> f64 {
    0.4 * metrics.total_flow
        + 0.3 * metrics.size as f64
        + 0.2 * metrics.density
        + 0.1 * metrics.external_connections as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn flow(source: &str, target: &str, weight: f64, prices: Option<(f64, f64)>) -> FlowRecord {
        FlowRecord {
            source: RegionId::new(source),
            target: RegionId::new(target),
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            flow_weight: weight,
            price_differential: 0.0,
            source_price: prices.map(|(s, _)| s),
            target_price: prices.map(|(_, t)| t),
            commodity: "wheat".to_string(),
        }
    }

    fn markets(ids: &[&str]) -> Vec<RegionId> {
        ids.iter().map(|id| RegionId::new(*id)).collect()
    }

    #[test]
    fn test_internal_external_split_and_density() {
        let members = markets(&["a", "b", "c"]);
        let flows = vec![
            flow("a", "b", 10.0, None),
            flow("b", "c", 5.0, None),
            flow("a", "x", 2.0, None), // boundary-crossing
        ];

        let metrics = compute(&members, &flows, BTreeMap::new(), 6);

        assert_eq!(metrics.size, 3);
        assert!((metrics.total_flow - 17.0).abs() < 1e-9);
        assert!((metrics.avg_flow - 17.0 / 3.0).abs() < 1e-9);
        assert!((metrics.density - 3.0 / 6.0).abs() < 1e-9);
        assert!((metrics.internal_flow_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.external_connections, 1);
        assert!((metrics.relative_size - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_flows_yields_zeroed_ratios() {
        let metrics = compute(&markets(&["a", "b"]), &[], BTreeMap::new(), 4);

        assert_eq!(metrics.total_flow, 0.0);
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.internal_flow_ratio, 0.0);
        assert_eq!(metrics.external_connections, 0);
        assert_eq!(metrics.price_integration, PriceIntegration::default());
    }

    #[test]
    fn test_single_market_cluster_has_zero_density() {
        let metrics = compute(
            &markets(&["a"]),
            &[flow("a", "x", 3.0, None)],
            BTreeMap::new(),
            2,
        );
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.external_connections, 1);
    }

    #[test]
    fn test_price_integration_mean_and_std() {
        let members = markets(&["a", "b", "c"]);
        let flows = vec![
            flow("a", "b", 1.0, Some((200.0, 220.0))), // gap = 20 / 210
            flow("b", "c", 1.0, Some((100.0, 100.0))), // gap = 0
            flow("a", "c", 1.0, None),                 // no prices, skipped
        ];

        let metrics = compute(&members, &flows, BTreeMap::new(), 3);

        let gap = 20.0 / 210.0;
        let mean = gap / 2.0;
        assert!((metrics.price_integration.mean - mean).abs() < 1e-12);
        // Two symmetric deviations of gap/2 each.
        assert!((metrics.price_integration.std - mean).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mid_price_is_skipped() {
        let flows = vec![flow("a", "b", 1.0, Some((0.0, 0.0)))];
        let metrics = compute(&markets(&["a", "b"]), &flows, BTreeMap::new(), 2);
        assert_eq!(metrics.price_integration, PriceIntegration::default());
    }

    #[test]
    fn test_ranking_score_weighting() {
        let mut metrics = ClusterMetrics::default();
        metrics.total_flow = 10.0;
        metrics.size = 4;
        metrics.density = 0.5;
        metrics.external_connections = 3;

        let expected = 0.4 * 10.0 + 0.3 * 4.0 + 0.2 * 0.5 + 0.1 * 3.0;
        assert!((ranking_score(&metrics) - expected).abs() < 1e-12);
    }
}

//! Precomputed spatial weights loader
//!
//! The source maps raw region names to neighbor/weight rows. Region names
//! on keys and neighbors are normalized, every non-empty row is rescaled to
//! sum to 1.0 regardless of what the file claims its total is. Structural
//! problems (mismatched parallel arrays, rows without positive weight mass)
//! fail the load; this file is derived data, so a broken row means a broken
//! producer rather than a noisy record.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::regions::RegionNormalizer;
use crate::types::{RegionId, SpatialWeightEntry, SpatialWeights};

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    neighbors: Vec<String>,
    #[serde(default)]
    weights: Vec<f64>,
}

pub(super) fn parse(
    raw: &str,
    normalizer: &RegionNormalizer,
) -> anyhow::Result<(SpatialWeights, usize, usize)> {
    let entries: BTreeMap<String, RawEntry> =
        serde_json::from_str(raw).context("not a spatial weights map")?;

    let mut weights = SpatialWeights::new();
    let mut dropped = 0usize;
    for (name, entry) in entries {
        if entry.neighbors.len() != entry.weights.len() {
            anyhow::bail!(
                "weights entry {:?} has {} neighbors but {} weights",
                name,
                entry.neighbors.len(),
                entry.weights.len()
            );
        }

        let region_id = normalizer.normalize(&name);
        let neighbors: Vec<RegionId> = entry
            .neighbors
            .iter()
            .map(|neighbor| normalizer.normalize(neighbor))
            .collect();
        let row = normalize_row(&region_id, neighbors, entry.weights)?;

        if weights.insert(region_id.clone(), row).is_some() {
            debug!(
                "duplicate weights entry for {} after normalization, keeping the last",
                region_id
            );
            dropped += 1;
        }
    }

    let records = weights.len();
    Ok((weights, records, dropped))
}

/// Rescale a row so its weights sum to 1.0. Isolated rows pass through.
fn normalize_row(
    region_id: &RegionId,
    neighbors: Vec<RegionId>,
    mut row_weights: Vec<f64>,
) -> anyhow::Result<SpatialWeightEntry> {
    if !neighbors.is_empty() {
        if row_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            anyhow::bail!("weights entry {} has a negative or non-finite weight", region_id);
        }
        let total: f64 = row_weights.iter().sum();
        if total <= 0.0 {
            anyhow::bail!("weights entry {} has no positive weight mass", region_id);
        }
        for weight in &mut row_weights {
            *weight /= total;
        }
    }
    Ok(SpatialWeightEntry {
        region_id: region_id.clone(),
        neighbors,
        weights: row_weights,
    })
}

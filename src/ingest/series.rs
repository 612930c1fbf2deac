//! Commodity time series loader
//!
//! The source is a feature collection whose properties carry one price
//! observation each. Observations are keyed by (region, commodity) and the
//! loader leaves every group sorted ascending by date. Rows without a
//! region, commodity, and parseable date are dropped and counted.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::regions::RegionNormalizer;
use crate::types::{TimeSeriesPoint, TimeSeriesSet};

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

pub(super) fn parse(
    raw: &str,
    normalizer: &RegionNormalizer,
) -> anyhow::Result<(TimeSeriesSet, usize, usize)> {
    let collection: RawCollection =
        serde_json::from_str(raw).context("not a time series feature collection")?;

    let mut set = TimeSeriesSet::new();
    let mut kept = 0usize;
    let mut dropped = 0usize;
    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties;

        let region = super::string_property(properties.get("region_id"));
        let commodity = super::string_property(properties.get("commodity"));
        let date = properties
            .get("date")
            .and_then(Value::as_str)
            .and_then(super::parse_date);
        let (Some(region), Some(commodity), Some(date)) = (region, commodity, date) else {
            debug!(
                "series feature {} missing region/commodity/date, dropped",
                index
            );
            dropped += 1;
            continue;
        };

        set.insert(TimeSeriesPoint {
            region_id: normalizer.normalize(&region),
            commodity,
            date,
            price: super::lenient_f64(properties.get("price")).unwrap_or(0.0),
            usd_price: super::lenient_f64(properties.get("usdprice")).unwrap_or(0.0),
            conflict_intensity: super::lenient_f64(properties.get("conflict_intensity"))
                .unwrap_or(0.0),
            residual: super::lenient_f64(properties.get("residual")).unwrap_or(0.0),
        });
        kept += 1;
    }

    set.sort_groups();
    Ok((set, kept, dropped))
}

//! GeoJSON boundaries loader
//!
//! Accepts a FeatureCollection of region boundaries, resolves a region name
//! from the feature properties, and reduces each geometry to its centroid.
//! Features without a usable name or geometry are dropped one by one; a
//! file that is not a feature collection at all fails the load.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::regions::RegionNormalizer;
use crate::types::{GeoDataset, GeoFeature, LatLng};

/// Property keys tried in order when resolving a feature's region name.
const NAME_KEYS: [&str; 3] = ["region_id", "admin1", "shapeName"];

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    #[serde(default)]
    geometry: Value,
}

pub(super) fn parse(
    raw: &str,
    normalizer: &RegionNormalizer,
) -> anyhow::Result<(GeoDataset, usize, usize)> {
    let collection: RawCollection =
        serde_json::from_str(raw).context("not a GeoJSON feature collection")?;

    let mut features = Vec::with_capacity(collection.features.len());
    let mut dropped = 0usize;
    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = NAME_KEYS
            .iter()
            .find_map(|key| super::string_property(feature.properties.get(*key)));
        let Some(name) = name else {
            debug!("geo feature {} has no usable region name, dropped", index);
            dropped += 1;
            continue;
        };

        let Some(centroid) = centroid(&feature.geometry) else {
            debug!("geo feature {} ({}) has no usable geometry, dropped", index, name);
            dropped += 1;
            continue;
        };

        features.push(GeoFeature {
            region_id: normalizer.normalize(&name),
            centroid,
            geometry: feature.geometry,
        });
    }

    let records = features.len();
    Ok((GeoDataset { features }, records, dropped))
}

/// Representative point for a GeoJSON geometry.
///
/// Points are taken as-is; polygons average the vertices of the exterior
/// ring, multi-polygons average across every part's exterior ring. The
/// closing vertex of a closed ring counts like any other vertex.
fn centroid(geometry: &Value) -> Option<LatLng> {
    let kind = geometry.get("type")?.as_str()?;
    let coordinates = geometry.get("coordinates")?;

    match kind {
        "Point" => position(coordinates),
        "Polygon" => mean_position(exterior_ring(coordinates)?.iter()),
        "MultiPolygon" => mean_position(
            coordinates
                .as_array()?
                .iter()
                .filter_map(exterior_ring)
                .flatten(),
        ),
        _ => None,
    }
}

/// GeoJSON positions are `[lng, lat]`.
fn position(value: &Value) -> Option<LatLng> {
    let coords = value.as_array()?;
    let lng = coords.first().and_then(Value::as_f64)?;
    let lat = coords.get(1).and_then(Value::as_f64)?;
    Some(LatLng::new(lat, lng))
}

fn exterior_ring(polygon: &Value) -> Option<&Vec<Value>> {
    polygon.as_array()?.first()?.as_array()
}

fn mean_position<'a>(positions: impl Iterator<Item = &'a Value>) -> Option<LatLng> {
    let mut lat_sum = 0.0;
    let mut lng_sum = 0.0;
    let mut count = 0usize;
    for value in positions {
        if let Some(point) = position(value) {
            lat_sum += point.lat;
            lng_sum += point.lng;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some(LatLng::new(lat_sum / count as f64, lng_sum / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_value(value: Value) -> (GeoDataset, usize, usize) {
        parse(&value.to_string(), &RegionNormalizer::new()).unwrap()
    }

    #[test]
    fn test_point_feature_with_normalized_name() {
        let (dataset, records, dropped) = parse_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "region_id": "Sana'a" },
                "geometry": { "type": "Point", "coordinates": [44.2, 15.35] }
            }]
        }));

        assert_eq!((records, dropped), (1, 0));
        let feature = &dataset.features[0];
        assert_eq!(feature.region_id.as_str(), "sanaa");
        assert!((feature.centroid.lat - 15.35).abs() < 1e-12);
        assert!((feature.centroid.lng - 44.2).abs() < 1e-12);
    }

    #[test]
    fn test_name_property_priority() {
        let (dataset, ..) = parse_value(json!({
            "features": [
                {
                    "properties": { "admin1": "Aden", "shapeName": "ignored" },
                    "geometry": { "type": "Point", "coordinates": [45.0, 12.8] }
                },
                {
                    "properties": { "shapeName": "Taizz" },
                    "geometry": { "type": "Point", "coordinates": [44.0, 13.6] }
                }
            ]
        }));

        assert_eq!(dataset.features[0].region_id.as_str(), "aden");
        assert_eq!(dataset.features[1].region_id.as_str(), "taiz");
    }

    #[test]
    fn test_polygon_centroid_is_exterior_ring_mean() {
        let (dataset, ..) = parse_value(json!({
            "features": [{
                "properties": { "region_id": "marib" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[44.0, 15.0], [45.0, 15.0], [45.0, 16.0], [44.0, 16.0], [44.0, 15.0]],
                        [[44.4, 15.4], [44.6, 15.4], [44.5, 15.6], [44.4, 15.4]]
                    ]
                }
            }]
        }));

        let centroid = dataset.features[0].centroid;
        // Exterior ring only, closing vertex included: 5 points.
        assert!((centroid.lng - 222.0 / 5.0).abs() < 1e-9);
        assert!((centroid.lat - 77.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_polygon_averages_all_exterior_rings() {
        let (dataset, ..) = parse_value(json!({
            "features": [{
                "properties": { "region_id": "hadramaut" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[0.0, 0.0], [2.0, 0.0], [1.0, 2.0]]],
                        [[[10.0, 10.0], [12.0, 10.0], [11.0, 12.0]]]
                    ]
                }
            }]
        }));

        let centroid = dataset.features[0].centroid;
        assert!((centroid.lng - 36.0 / 6.0).abs() < 1e-9);
        assert!((centroid.lat - 34.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_features_without_name_or_geometry_are_dropped() {
        let (dataset, records, dropped) = parse_value(json!({
            "features": [
                { "properties": {}, "geometry": { "type": "Point", "coordinates": [1.0, 2.0] } },
                { "properties": { "region_id": "aden" }, "geometry": null },
                { "properties": { "region_id": "aden" }, "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] } },
                { "properties": { "region_id": "lahj" }, "geometry": { "type": "Point", "coordinates": [44.9, 13.0] } }
            ]
        }));

        assert_eq!((records, dropped), (1, 3));
        assert_eq!(dataset.features[0].region_id.as_str(), "lahj");
    }

    #[test]
    fn test_geometry_preserved_verbatim() {
        let geometry = json!({ "type": "Point", "coordinates": [44.2, 15.35] });
        let (dataset, ..) = parse_value(json!({
            "features": [{ "properties": { "region_id": "sanaa" }, "geometry": geometry.clone() }]
        }));

        assert_eq!(dataset.features[0].geometry, geometry);
    }

    #[test]
    fn test_missing_features_key_is_malformed() {
        assert!(parse("{}", &RegionNormalizer::new()).is_err());
        assert!(parse("[1, 2]", &RegionNormalizer::new()).is_err());
        assert!(parse("not json", &RegionNormalizer::new()).is_err());
    }
}

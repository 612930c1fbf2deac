pub mod analysis;
pub mod cluster;
pub mod config;
pub mod data_paths;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod queue;
pub mod regions;
pub mod spatial;
pub mod types;

// Re-export the pieces a typical caller wires together
pub use cluster::ClusteringEngine;
pub use config::AnalysisConfig;
pub use ingest::{BaseDataset, IngestPipeline};
pub use queue::TaskQueue;
pub use regions::RegionNormalizer;
pub use spatial::SpatialWeightsBuilder;

#[cfg(test)]
mod tests {
    //! Whole-pipeline smoke test: files on disk through ingestion, weights
    //! construction, and clustering.

    use std::sync::Arc;

    use crate::cluster::ClusteringEngine;
    use crate::config::AnalysisConfig;
    use crate::data_paths::{
        DataPaths, GEO_BOUNDARIES_FILE, SPATIAL_WEIGHTS_FILE, TIME_SERIES_FILE, TRADE_FLOWS_FILE,
    };
    use crate::ingest::IngestPipeline;
    use crate::queue::TaskQueue;
    use crate::regions::RegionNormalizer;
    use crate::spatial::SpatialWeightsBuilder;
    use crate::types::RegionId;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    /// Four governorate centroids. Sana'a-Taiz, Sana'a-Hodeidah,
    /// Taiz-Hodeidah, and Taiz-Aden all sit under 200 km; Aden only
    /// connects through Taiz.
    fn geo_fixture() -> String {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "properties": { "region_id": "Sana'a" },
                    "geometry": { "type": "Point", "coordinates": [44.20, 15.35] }
                },
                {
                    "properties": { "region_id": "Aden" },
                    "geometry": { "type": "Point", "coordinates": [45.03, 12.80] }
                },
                {
                    "properties": { "admin1": "Ta'izz" },
                    "geometry": { "type": "Point", "coordinates": [44.02, 13.58] }
                },
                {
                    "properties": { "shapeName": "Al Hudaydah" },
                    "geometry": { "type": "Point", "coordinates": [42.95, 14.80] }
                }
            ]
        })
        .to_string()
    }

    fn flows_fixture() -> String {
        "source,target,date,flow_weight,price_differential,source_lat,source_lng,target_lat,target_lng,source_price,target_price,commodity\n\
         Sana'a,Aden,2023-03-01,10,0.05,15.35,44.20,12.80,45.03,210,220,wheat\n\
         Aden,Ta'izz,2023-03-02,5,0.02,12.80,45.03,13.58,44.02,195,205,wheat\n\
         Aden,,2023-03-03,7,0.01,,,,,,,wheat"
            .to_string()
    }

    fn series_fixture() -> String {
        serde_json::json!({
            "features": [
                { "properties": { "region_id": "Sana'a", "commodity": "wheat", "date": "2023-03-01", "price": 210.0, "usdprice": 0.42 } },
                { "properties": { "region_id": "Sana'a", "commodity": "wheat", "date": "2023-02-01", "price": 205.0, "usdprice": 0.41 } },
                { "properties": { "region_id": "Aden", "commodity": "wheat", "date": "2023-03-01", "price": 220.0, "usdprice": 0.44 } }
            ]
        })
        .to_string()
    }

    fn weights_fixture() -> String {
        serde_json::json!({
            "Sana'a": { "neighbors": ["Al Hudaydah"], "weights": [3.0], "totalWeight": 3.0 }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_preprocessing_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        write(&dir, GEO_BOUNDARIES_FILE, &geo_fixture());
        write(&dir, TRADE_FLOWS_FILE, &flows_fixture());
        write(&dir, TIME_SERIES_FILE, &series_fixture());
        write(&dir, SPATIAL_WEIGHTS_FILE, &weights_fixture());

        let config = AnalysisConfig::new();
        let paths = DataPaths::new(dir.path());
        let pipeline = IngestPipeline::new(
            Arc::new(TaskQueue::new(config.concurrency_limit)),
            RegionNormalizer::new(),
        );

        let dataset = pipeline.load_all(&paths).await.unwrap();

        assert_eq!(dataset.geo.len(), 4);
        assert!(dataset.geo.feature(&RegionId::new("hodeidah")).is_some());
        assert_eq!(dataset.flows.len(), 2);
        assert_eq!(dataset.summary.flows.dropped, 1);
        assert_eq!(dataset.series.len(), 2);
        assert_eq!(dataset.series.point_count(), 3);
        assert!(dataset
            .weights
            .contains_key(&RegionId::new("sanaa")));

        let weights =
            SpatialWeightsBuilder::new(config.neighbor_threshold_km).build(&dataset.geo.features);

        let sanaa = &weights[&RegionId::new("sanaa")];
        assert!(sanaa.neighbors.contains(&RegionId::new("taiz")));
        assert!(sanaa.neighbors.contains(&RegionId::new("hodeidah")));
        assert!(!sanaa.neighbors.contains(&RegionId::new("aden")));
        let row_sum: f64 = sanaa.weights.iter().sum();
        assert!((row_sum - 1.0).abs() < 1e-9);

        let clusters = ClusteringEngine::new(config.min_cluster_size)
            .identify_clusters(&weights, &dataset.flows);

        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.size(), 4);
        assert!(cluster.contains(&cluster.main_market));
        // Aden touches both flows: 10 + 5 against Sana'a's 10.
        assert_eq!(cluster.main_market, RegionId::new("aden"));
        assert!((cluster.metrics.total_flow - 15.0).abs() < 1e-9);
        assert!((cluster.metrics.internal_flow_ratio - 1.0).abs() < 1e-9);
        assert!((cluster.metrics.relative_size - 1.0).abs() < 1e-9);
    }
}

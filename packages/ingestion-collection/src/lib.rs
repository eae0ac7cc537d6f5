pub mod collector;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod persistence;
pub mod types;

pub use collector::Collector;
pub use error::{CollectOutcome, CollectionError};
pub use orchestrator::CollectionOrchestrator;
pub use persistence::CollectionStore;
pub use types::{
    CollectedItem, CollectionConfig, CollectionMode, CollectionProgress, CollectionResult, Confidence,
    RegistryEntry,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, target_type: &str, region: &str, priority: i32) -> RegistryEntry {
        RegistryEntry {
            id: id.to_string(),
            name: format!("target-{id}"),
            target_type: target_type.to_string(),
            region: region.to_string(),
            website_url: None,
            collection_priority: priority,
            last_collection_at: Some(Utc::now()),
        }
    }

    #[test]
    fn select_targets_filters_by_type_and_region_and_orders_by_priority() {
        let targets = vec![
            entry("1", "single_family", "us", 9),
            entry("2", "multi_family", "us", 1),
            entry("3", "single_family", "europe", 2),
        ];
        let orchestrator = CollectionOrchestrator::new(targets);

        let config = CollectionConfig {
            target_types: Some(vec!["single_family".to_string()]),
            regions: Some(vec!["us".to_string()]),
            mode: CollectionMode::Full,
            ..Default::default()
        };

        let selected = orchestrator.select_targets(&config);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "1");
    }

    #[test]
    fn incremental_mode_skips_freshly_collected_targets() {
        let mut fresh = entry("1", "single_family", "us", 1);
        fresh.last_collection_at = Some(Utc::now());
        let mut stale = entry("2", "single_family", "us", 2);
        stale.last_collection_at = Some(Utc::now() - chrono::Duration::days(200));

        let orchestrator = CollectionOrchestrator::new(vec![fresh, stale]);
        let config = CollectionConfig { mode: CollectionMode::Incremental, ..Default::default() };

        let selected = orchestrator.select_targets(&config);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "2");
    }

    #[test]
    fn explicit_target_ids_override_other_filters() {
        let targets = vec![entry("1", "single_family", "us", 1), entry("2", "multi_family", "europe", 2)];
        let orchestrator = CollectionOrchestrator::new(targets);
        let config = CollectionConfig {
            target_ids: Some(vec!["2".to_string()]),
            mode: CollectionMode::Full,
            ..Default::default()
        };

        let selected = orchestrator.select_targets(&config);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "2");
    }
}

//! Collection domain types: configuration, the registry entries a
//! collection run fans out over, and the items each source collector
//! returns before dedup/merge and persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    /// Only collect targets whose data is older than `max_age_days`.
    Incremental,
    /// Force re-collection regardless of staleness.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub target_types: Option<Vec<String>>,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    pub sources: Vec<String>,
    #[serde(default = "default_mode")]
    pub mode: CollectionMode,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
    #[serde(default = "default_max_concurrent_targets")]
    pub max_concurrent_targets: usize,
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub target_ids: Option<Vec<String>>,
}

fn default_mode() -> CollectionMode {
    CollectionMode::Incremental
}
fn default_max_age_days() -> i64 {
    90
}
fn default_max_concurrent_targets() -> usize {
    5
}
fn default_rate_limit_delay() -> f64 {
    2.0
}
fn default_max_retries() -> u32 {
    3
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            target_types: None,
            regions: None,
            sources: vec!["website".to_string()],
            mode: CollectionMode::Incremental,
            max_age_days: default_max_age_days(),
            max_concurrent_targets: default_max_concurrent_targets(),
            rate_limit_delay: default_rate_limit_delay(),
            max_retries: default_max_retries(),
            target_id: None,
            target_ids: None,
        }
    }
}

/// A collection target loaded from a registry (LP or FO, depending on
/// which registry the orchestrator is pointed at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub name: String,
    pub target_type: String,
    pub region: String,
    pub website_url: Option<String>,
    #[serde(default = "default_priority")]
    pub collection_priority: i32,
    pub last_collection_at: Option<DateTime<Utc>>,
}

fn default_priority() -> i32 {
    5
}

impl RegistryEntry {
    pub fn is_stale(&self, max_age_days: i64, now: DateTime<Utc>) -> bool {
        match self.last_collection_at {
            None => true,
            Some(last) => now.signed_duration_since(last) > chrono::Duration::days(max_age_days),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low = 1,
    Medium = 2,
    High = 3,
}

/// One piece of data a source collector surfaced for a target, before
/// dedup/merge. `item_type` drives the dedup key ([`crate::normalizer`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedItem {
    pub item_type: String,
    pub data: HashMap<String, serde_json::Value>,
    pub source_url: Option<String>,
    pub confidence: Confidence,
    pub is_new: bool,
}

impl CollectedItem {
    pub fn new(item_type: impl Into<String>, data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            item_type: item_type.into(),
            data,
            source_url: None,
            confidence: Confidence::Medium,
            is_new: true,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Outcome of collecting one (target, source) pair.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub target_id: String,
    pub target_name: String,
    pub source: String,
    pub success: bool,
    pub items: Vec<CollectedItem>,
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
}

impl CollectionResult {
    pub fn items_new(&self) -> usize {
        self.items.iter().filter(|i| i.is_new).count()
    }

    pub fn items_updated(&self) -> usize {
        self.items.iter().filter(|i| !i.is_new).count()
    }
}

/// Progress snapshot for an in-flight collection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionProgress {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub current: Option<String>,
}

impl CollectionProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_when_never_collected() {
        let entry = RegistryEntry {
            id: "1".into(),
            name: "Acme".into(),
            target_type: "single_family".into(),
            region: "us".into(),
            website_url: None,
            collection_priority: 5,
            last_collection_at: None,
        };
        assert!(entry.is_stale(90, Utc::now()));
    }

    #[test]
    fn fresh_within_max_age() {
        let now = Utc::now();
        let entry = RegistryEntry {
            id: "1".into(),
            name: "Acme".into(),
            target_type: "single_family".into(),
            region: "us".into(),
            website_url: None,
            collection_priority: 5,
            last_collection_at: Some(now - chrono::Duration::days(10)),
        };
        assert!(!entry.is_stale(90, now));
    }

    #[test]
    fn progress_percent_handles_zero_total() {
        let progress = CollectionProgress::default();
        assert_eq!(progress.percent(), 0.0);
    }
}

//! Collection Orchestrator (C8): selects targets from a registry,
//! fans out across them under `max_concurrent_targets`, runs every
//! configured source's collector per target, deduplicates the results,
//! and tracks progress as the run proceeds.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info};

use crate::collector::Collector;
use crate::error::CollectionError;
use crate::normalizer;
use crate::persistence::CollectionStore;
use crate::types::{CollectedItem, CollectionConfig, CollectionProgress, CollectionResult, RegistryEntry};

pub struct CollectionOrchestrator {
    targets: Vec<RegistryEntry>,
    collectors: HashMap<&'static str, Arc<dyn Collector>>,
    progress: Arc<Mutex<CollectionProgress>>,
    store: Option<Arc<CollectionStore>>,
}

impl CollectionOrchestrator {
    pub fn new(targets: Vec<RegistryEntry>) -> Self {
        Self {
            targets,
            collectors: HashMap::new(),
            progress: Arc::new(Mutex::new(CollectionProgress::default())),
            store: None,
        }
    }

    pub fn register_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.insert(collector.source(), collector);
        self
    }

    /// Persist deduplicated items as each target finishes collecting.
    /// Without a store, `run` still collects, dedups, and tracks
    /// progress — only persistence is skipped.
    pub fn with_store(mut self, store: CollectionStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub async fn progress(&self) -> CollectionProgress {
        self.progress.lock().await.clone()
    }

    /// Filter the loaded registry by type/region/explicit id(s), then by
    /// staleness for incremental mode, then order by collection priority
    /// (lower number collects first, matching the registry's convention).
    pub fn select_targets(&self, config: &CollectionConfig) -> Vec<RegistryEntry> {
        let now = Utc::now();
        let mut selected: Vec<RegistryEntry> = self
            .targets
            .iter()
            .filter(|t| config.target_types.as_ref().is_none_or(|types| types.contains(&t.target_type)))
            .filter(|t| config.regions.as_ref().is_none_or(|regions| regions.contains(&t.region)))
            .filter(|t| config.target_id.as_ref().is_none_or(|id| &t.id == id))
            .filter(|t| config.target_ids.as_ref().is_none_or(|ids| ids.contains(&t.id)))
            .filter(|t| match config.mode {
                crate::types::CollectionMode::Full => true,
                crate::types::CollectionMode::Incremental => t.is_stale(config.max_age_days, now),
            })
            .cloned()
            .collect();

        selected.sort_by_key(|t| t.collection_priority);
        selected
    }

    pub async fn run(&self, config: &CollectionConfig) -> Vec<CollectionResult> {
        let targets = self.select_targets(config);
        {
            let mut progress = self.progress.lock().await;
            *progress = CollectionProgress { total: targets.len(), ..Default::default() };
        }

        if targets.is_empty() {
            info!("no targets selected for collection");
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_targets.max(1)));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let semaphore = semaphore.clone();
            let progress = self.progress.clone();
            let store = self.store.clone();
            let collectors: Vec<Arc<dyn Collector>> = config
                .sources
                .iter()
                .filter_map(|source| self.collectors.get(source.as_str()).cloned())
                .collect();
            let rate_limit_delay = config.rate_limit_delay;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore is never closed");
                {
                    let mut progress = progress.lock().await;
                    progress.current = Some(target.name.clone());
                }

                let (mut results, mut deduped) = collect_target(&target, &collectors, rate_limit_delay).await;

                if let Some(store) = &store {
                    if let Err(error) = store.persist(&target.id, &mut deduped).await {
                        error!(target = %target.name, %error, "failed to persist collected items");
                        for result in &mut results {
                            result.warnings.push(format!("persistence failed: {error}"));
                        }
                    }
                }

                let succeeded = results.iter().all(|r| r.success);
                let mut progress = progress.lock().await;
                progress.completed += 1;
                if succeeded {
                    progress.succeeded += 1;
                } else {
                    progress.failed += 1;
                }
                results
            }));
        }

        let mut all_results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(results) => all_results.extend(results),
                Err(join_error) => error!(%join_error, "collection task panicked"),
            }
        }
        all_results
    }
}

/// Runs every collector for one target and returns both the raw
/// per-source results (for reporting) and the cross-source-deduplicated
/// item set (for persistence) — §4.8's dedup/merge step operates on the
/// combined set, not on any single source's output alone.
async fn collect_target(
    target: &RegistryEntry,
    collectors: &[Arc<dyn Collector>],
    rate_limit_delay: f64,
) -> (Vec<CollectionResult>, Vec<CollectedItem>) {
    let mut results = Vec::with_capacity(collectors.len());
    let mut all_items: Vec<CollectedItem> = Vec::new();

    for (i, collector) in collectors.iter().enumerate() {
        if i > 0 && rate_limit_delay > 0.0 {
            tokio::time::sleep(std::time::Duration::from_secs_f64(rate_limit_delay)).await;
        }

        match collector.collect(target).await {
            Ok(items) => {
                all_items.extend(items.clone());
                results.push(CollectionResult {
                    target_id: target.id.clone(),
                    target_name: target.name.clone(),
                    source: collector.source().to_string(),
                    success: true,
                    items,
                    error_message: None,
                    warnings: Vec::new(),
                });
            }
            Err(error) => {
                error!(target = %target.name, source = collector.source(), %error, "collection failed");
                results.push(failed_result(target, collector.source(), &error));
            }
        }
    }

    let deduped = normalizer::deduplicate(&target.id, all_items);
    (results, deduped)
}

fn failed_result(target: &RegistryEntry, source: &str, error: &CollectionError) -> CollectionResult {
    CollectionResult {
        target_id: target.id.clone(),
        target_name: target.name.clone(),
        source: source.to_string(),
        success: false,
        items: Vec::new(),
        error_message: Some(error.to_string()),
        warnings: Vec::new(),
    }
}

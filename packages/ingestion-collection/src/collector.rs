//! Narrower capability a source adapter implements to feed the
//! Collection Orchestrator: one target in, a handful of typed items out,
//! rather than the flat `Vec<Row>` a provisioned-table adapter returns.

use async_trait::async_trait;

use crate::error::CollectOutcome;
use crate::types::{CollectedItem, RegistryEntry};

#[async_trait]
pub trait Collector: Send + Sync {
    /// Matches one of `CollectionConfig::sources`' entries (`"website"`,
    /// `"news"`, `"deals"`, ...).
    fn source(&self) -> &'static str;

    async fn collect(&self, target: &RegistryEntry) -> CollectOutcome<Vec<CollectedItem>>;
}

use std::borrow::Cow;

use job_engine::{Categorizable, SafeErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("no collector registered for source {0:?}")]
    UnknownSource(String),
    #[error(transparent)]
    Adapter(#[from] ingestion_adapters::AdapterError),
    #[error(transparent)]
    Warehouse(#[from] warehouse::WarehouseError),
}

impl Categorizable for CollectionError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            CollectionError::UnknownSource(_) => SafeErrorCategory::Config,
            CollectionError::Adapter(e) => e.category(),
            CollectionError::Warehouse(e) => e.category(),
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            CollectionError::UnknownSource(_) => Cow::Borrowed("requested collection source is not configured"),
            CollectionError::Adapter(e) => e.safe_message(),
            CollectionError::Warehouse(e) => e.safe_message(),
        }
    }
}

pub type CollectOutcome<T> = Result<T, CollectionError>;

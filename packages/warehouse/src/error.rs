//! Warehouse boundary errors.

use std::borrow::Cow;

use job_engine::{Categorizable, SafeErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("conflict key {conflict_key:?} does not match any unique constraint on {table}")]
    ConflictKeyMismatch { table: String, conflict_key: Vec<String> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Categorizable for WarehouseError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            WarehouseError::InvalidSchema(_) | WarehouseError::ConflictKeyMismatch { .. } => {
                SafeErrorCategory::Config
            }
            WarehouseError::Database(e) => {
                if is_transient(e) {
                    SafeErrorCategory::Transient
                } else {
                    SafeErrorCategory::Upsert
                }
            }
            WarehouseError::Serialization(_) => SafeErrorCategory::Parse,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            WarehouseError::InvalidSchema(_) => "invalid table schema".into(),
            WarehouseError::ConflictKeyMismatch { .. } => {
                "conflict key does not match a declared unique constraint".into()
            }
            WarehouseError::Database(_) => "a database error occurred".into(),
            WarehouseError::Serialization(_) => "failed to serialize row data".into(),
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

pub type WarehouseResult<T> = std::result::Result<T, WarehouseError>;

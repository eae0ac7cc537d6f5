//! Postgres persistence: the Table Provisioner (C3) and Batch Writer (C4),
//! plus the `JobStore` implementation `ingestion-jobs`' Job Runner claims
//! work through.
//!
//! Built on raw `sqlx::query`/`QueryBuilder` rather than the `query!`
//! compile-time macro, since column sets are only known at runtime from an
//! adapter's declared schema.

pub mod error;
pub mod job_store;
pub mod provisioner;
pub mod registry;
pub mod schema;
pub mod writer;

pub use error::{WarehouseError, WarehouseResult};
pub use job_store::PostgresJobStore;
pub use provisioner::{PrepareOutcome, Provisioner};
pub use registry::{DatasetRegistry, DatasetRegistryEntry};
pub use schema::{normalize_column_name, table_name, ColumnSpec, ColumnType, IndexSpec, Row, SchemaSpec, Value};
pub use writer::BatchWriter;

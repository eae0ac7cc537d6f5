//! `SourceAdapter` trait (C2): the pure `schema_for`/`plan`/`parse`
//! operations every source implements, plus representative adapters for
//! the platform's source families.

pub mod adapter;
pub mod error;
pub mod families;
pub mod plan;

pub use adapter::{AdapterConfig, JobParams, SourceAdapter};
pub use error::{AdapterError, AdapterResult};
pub use families::{CafrPdfAdapter, EiaAdapter, SecEdgarAdapter, WebsiteCrawlerAdapter};
pub use plan::{FetchPlan, HttpMethod, PlannedRequest};
pub use warehouse::{normalize_column_name, table_name, Row, Value};

//! Representative adapters per source family named in the platform's
//! registry. Each demonstrates the shape a new source of that family
//! follows; additional sources within a family are config, not new code.

pub mod cafr_pdf;
pub mod eia;
pub mod sec_edgar;
pub mod website_crawler;

pub use cafr_pdf::CafrPdfAdapter;
pub use eia::EiaAdapter;
pub use sec_edgar::SecEdgarAdapter;
pub use website_crawler::WebsiteCrawlerAdapter;

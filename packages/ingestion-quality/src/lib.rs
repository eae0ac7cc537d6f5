pub mod anomaly;
pub mod cross_source;
pub mod defaults;
pub mod evaluator;
pub mod pipeline;
pub mod profiler;
pub mod score;
pub mod seeder;
pub mod store;
pub mod types;

pub use anomaly::{Anomaly, AnomalyAlert};
pub use cross_source::CrossSourceMismatch;
pub use defaults::default_rules_for;
pub use evaluator::evaluate;
pub use pipeline::{run as run_pipeline, QualityResult};
pub use profiler::profile;
pub use score::score;
pub use seeder::seed_rules;
pub use store::QualityStore;
pub use types::{
    AlertStatus, ProfileColumn, ProfileSnapshot, QualityRule, QualityScore, RuleSeverity, RuleType, RuleViolation,
};

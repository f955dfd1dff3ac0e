// riskwatch-core/src/application/mod.rs

pub mod alerting;
pub mod monitor;
pub mod prediction;
pub mod source;

// --- RE-EXPORTS ---
// The CLI only needs `use riskwatch_core::application::{run_monitor, acknowledge_alert, ...};`

pub use alerting::{
    AlertMaterializer, MaterializeReport, PartitionEvaluation, acknowledge_alert, close_alert,
    list_alerts,
};
pub use monitor::{PartitionReport, PartitionStatus, RunSummary, run_monitor};
pub use prediction::record_prediction;
pub use source::MetricSourceAdapter;

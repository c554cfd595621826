//! 執行流程元件
//!
//! 掃描 → 派發 → 彙整 → 報告。每個檔案是一個獨立的工作單元，
//! 失敗只記錄在統計中，不影響其他單元。

mod main;
mod metrics;
mod report;

pub use main::{DispatchMode, Orchestrator, RunPhase};
pub use metrics::{DispositionCounts, FailedAsset, PartialSuccess, RunMetrics, UnitOutcome};
pub use report::RunReport;

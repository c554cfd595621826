//! 功能元件模組
//!
//! 每個子模組實現管線中的一個步驟，包含主要邏輯和專用工具

pub mod archive_router;
pub mod duration_classifier;
pub mod orchestrator;
pub mod timelapse_encoder;

pub use archive_router::ArchiveRouter;
pub use duration_classifier::{Disposition, classify};
pub use orchestrator::{Orchestrator, RunReport};
pub use timelapse_encoder::{TimelapseEncoder, TimelapseJob};

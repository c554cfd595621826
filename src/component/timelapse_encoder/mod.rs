//! 縮時編碼元件
//!
//! 串流讀取來源影格，每 `speed_up_factor` 幀平均成一幀，以固定幀率輸出

mod accumulator;
mod main;

pub use accumulator::FrameAccumulator;
pub use main::{EncodeSummary, TimelapseEncoder, TimelapseJob, source_tag};

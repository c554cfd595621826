pub mod load;
pub mod save;
pub mod types;

pub use types::{
    DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_FRAME_RATE, RelocationMode, RunConfig, Thresholds,
};

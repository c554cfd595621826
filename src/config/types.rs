use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 預設設定檔名稱（位於目前工作目錄）
pub const DEFAULT_CONFIG_FILE: &str = "timelapse_archiver.json";

/// 縮時輸出固定的幀率
pub const DEFAULT_OUTPUT_FRAME_RATE: f64 = 30.0;

/// 直接搬移時使用移動或複製
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    /// 傳輸成功後刪除來源
    #[default]
    Move,
    /// 保留來源
    Copy,
}

impl fmt::Display for RelocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "move"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// 長度分類門檻（單位：秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub skip_below: f64,
    pub timelapse_above: f64,
    pub desired_output_duration: f64,
}

impl Thresholds {
    /// 確認門檻順序：`skip_below <= timelapse_above` 且
    /// `desired_output_duration <= timelapse_above`，
    /// 如此選到縮時時倍率一定 >= 2
    pub fn validate(&self) -> Result<(), PipelineError> {
        let values = [
            ("skipBelowSeconds", self.skip_below),
            ("timelapseAboveSeconds", self.timelapse_above),
            ("desiredOutputDurationSeconds", self.desired_output_duration),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::configuration(format!(
                    "{name} 必須是非負的有限數值，目前為 {value}"
                )));
            }
        }
        if self.desired_output_duration <= 0.0 {
            return Err(PipelineError::configuration(
                "desiredOutputDurationSeconds 必須大於 0",
            ));
        }
        if self.skip_below > self.timelapse_above {
            return Err(PipelineError::configuration(format!(
                "skipBelowSeconds ({}) 不可大於 timelapseAboveSeconds ({})",
                self.skip_below, self.timelapse_above
            )));
        }
        if self.desired_output_duration > self.timelapse_above {
            return Err(PipelineError::configuration(format!(
                "desiredOutputDurationSeconds ({}) 不可大於 timelapseAboveSeconds ({})",
                self.desired_output_duration, self.timelapse_above
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    pub skip_below_seconds: f64,
    pub timelapse_above_seconds: f64,
    pub desired_output_duration_seconds: f64,
    pub output_frame_rate: f64,
    /// `None` 代表使用可用的平行度
    pub worker_pool_size: Option<usize>,
    pub relocation_mode: RelocationMode,
    pub timelapse_retain_source: bool,
    pub archive_root_path: Option<PathBuf>,
    pub scan_root_paths: Vec<PathBuf>,
    /// 副檔名（不含點，不分大小寫）
    pub extensions: Vec<String>,
    pub timelapse_prefix: String,
    pub use_removable_volumes: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            skip_below_seconds: 30.0,
            timelapse_above_seconds: 120.0,
            desired_output_duration_seconds: 30.0,
            output_frame_rate: DEFAULT_OUTPUT_FRAME_RATE,
            worker_pool_size: None,
            relocation_mode: RelocationMode::Move,
            timelapse_retain_source: true,
            archive_root_path: None,
            scan_root_paths: Vec::new(),
            extensions: vec!["mp4".to_string()],
            timelapse_prefix: "speedup_".to_string(),
            use_removable_volumes: false,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        Thresholds {
            skip_below: self.skip_below_seconds,
            timelapse_above: self.timelapse_above_seconds,
            desired_output_duration: self.desired_output_duration_seconds,
        }
    }

    /// 實際使用的工作執行緒數量
    #[must_use]
    pub fn effective_pool_size(&self) -> usize {
        self.worker_pool_size.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.thresholds().validate()?;

        if !self.output_frame_rate.is_finite() || self.output_frame_rate <= 0.0 {
            return Err(PipelineError::configuration(format!(
                "outputFrameRate 必須大於 0，目前為 {}",
                self.output_frame_rate
            )));
        }
        if self.worker_pool_size == Some(0) {
            return Err(PipelineError::configuration("workerPoolSize 必須大於 0"));
        }
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(PipelineError::configuration("extensions 不可為空"));
        }
        Ok(())
    }
}

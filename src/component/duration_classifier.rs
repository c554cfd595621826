//! 依影片長度決定處理方式

use crate::config::Thresholds;
use crate::error::PipelineError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Disposition {
    /// 太短，不處理
    Skip,
    /// 原樣搬到封存資料夾
    RelocateVerbatim,
    /// 平均連續影格產生縮時影片
    Timelapse { speed_up_factor: u32 },
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "Skip"),
            Self::RelocateVerbatim => write!(f, "RelocateVerbatim"),
            Self::Timelapse { speed_up_factor } => write!(f, "Timelapse({speed_up_factor}x)"),
        }
    }
}

/// 分類影片長度
///
/// - `duration > timelapse_above`：縮時，倍率為 `ceil(duration / desired_output_duration)`
/// - `skip_below <= duration <= timelapse_above`：原樣搬移
/// - 其餘（含 NaN）：略過
pub fn classify(duration: f64, thresholds: &Thresholds) -> Result<Disposition, PipelineError> {
    thresholds.validate()?;

    if duration > thresholds.timelapse_above {
        let factor = (duration / thresholds.desired_output_duration).ceil();
        // 門檻順序已保證 factor >= 2，這裡只是防止浮點誤差產生 1
        if factor < 2.0 {
            return Err(PipelineError::configuration(format!(
                "長度 {duration}s 算出的加速倍率 {factor} 小於 2"
            )));
        }
        return Ok(Disposition::Timelapse {
            speed_up_factor: factor as u32,
        });
    }

    if duration >= thresholds.skip_below {
        return Ok(Disposition::RelocateVerbatim);
    }

    Ok(Disposition::Skip)
}

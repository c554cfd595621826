use crate::component::duration_classifier::Disposition;
use crate::error::{FailureKind, PipelineError};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionCounts {
    pub skip: usize,
    pub relocate_verbatim: usize,
    pub timelapse: usize,
}

impl DispositionCounts {
    pub const fn count(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Skip => self.skip += 1,
            Disposition::RelocateVerbatim => self.relocate_verbatim += 1,
            Disposition::Timelapse { .. } => self.timelapse += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAsset {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSuccess {
    pub path: PathBuf,
    pub warning: String,
}

/// 單一工作單元的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// 依分類不需處理
    Untouched,
    /// 目的地已存在，沿用先前的結果
    AlreadyArchived,
    Relocated {
        original_bytes: u64,
        new_bytes: u64,
    },
    Timelapsed {
        original_bytes: u64,
        new_bytes: u64,
        warning: Option<String>,
    },
    Failed {
        kind: FailureKind,
        reason: String,
    },
}

impl From<PipelineError> for UnitOutcome {
    fn from(error: PipelineError) -> Self {
        Self::Failed {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// 整次執行的統計；只透過 `absorb` 更新
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// 已搬移或縮時的來源大小總和
    pub original_bytes: u64,
    pub new_bytes: u64,
    /// 所有掃描到的影片大小總和
    pub scanned_bytes: u64,
    pub dispositions: DispositionCounts,
    pub untouched: usize,
    pub relocated: usize,
    pub timelapsed: usize,
    pub already_archived: usize,
    pub partial: Vec<PartialSuccess>,
    pub failed: Vec<FailedAsset>,
    pub elapsed_seconds: f64,
}

impl RunMetrics {
    pub fn absorb(&mut self, path: &Path, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Untouched => self.untouched += 1,
            UnitOutcome::AlreadyArchived => self.already_archived += 1,
            UnitOutcome::Relocated {
                original_bytes,
                new_bytes,
            } => {
                self.relocated += 1;
                self.original_bytes += original_bytes;
                self.new_bytes += new_bytes;
            }
            UnitOutcome::Timelapsed {
                original_bytes,
                new_bytes,
                warning,
            } => {
                self.timelapsed += 1;
                self.original_bytes += original_bytes;
                self.new_bytes += new_bytes;
                if let Some(warning) = warning {
                    self.partial.push(PartialSuccess {
                        path: path.to_path_buf(),
                        warning,
                    });
                }
            }
            UnitOutcome::Failed { kind, reason } => self.failed.push(FailedAsset {
                path: path.to_path_buf(),
                kind,
                reason,
            }),
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.relocated + self.timelapsed
    }

    /// 讓報告的順序不受完成順序影響
    pub fn sort(&mut self) {
        self.failed.sort_by(|a, b| a.path.cmp(&b.path));
        self.partial.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

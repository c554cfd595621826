//! 管線錯誤分類
//!
//! 每一種錯誤對應一種復原策略：單檔錯誤只影響該檔案的工作單元，
//! 只有 `Configuration` 會讓整個執行中止。

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 無法開啟來源，或幀率為零/負數
    #[error("無法讀取媒體 {}: {reason}", path.display())]
    UnreadableMedia { path: PathBuf, reason: String },

    /// 門檻設定互相矛盾，在派發任何工作前就會回報
    #[error("設定錯誤: {0}")]
    Configuration(String),

    #[error("無法開啟編碼器 {}: {reason}", path.display())]
    EncoderOpen { path: PathBuf, reason: String },

    #[error("解碼失敗 {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("無法寫入目的地 {}: {reason}", path.display())]
    DestinationWrite { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn unreadable(path: &Path, reason: impl fmt::Display) -> Self {
        Self::UnreadableMedia {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(reason: impl fmt::Display) -> Self {
        Self::Configuration(reason.to_string())
    }

    pub fn encoder_open(path: &Path, reason: impl fmt::Display) -> Self {
        Self::EncoderOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: &Path, reason: impl fmt::Display) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn destination_write(path: &Path, reason: impl fmt::Display) -> Self {
        Self::DestinationWrite {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::UnreadableMedia { .. } => FailureKind::UnreadableMedia,
            Self::Configuration(_) => FailureKind::Configuration,
            Self::EncoderOpen { .. } => FailureKind::EncoderOpen,
            Self::Decode { .. } => FailureKind::Decode,
            Self::DestinationWrite { .. } => FailureKind::DestinationWrite,
        }
    }
}

/// 報告中使用的失敗種類標籤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    UnreadableMedia,
    Configuration,
    EncoderOpen,
    Decode,
    DestinationWrite,
    /// 中斷信號後尚未開始的工作
    Interrupted,
    /// 工作單元內部 panic
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnreadableMedia => "UnreadableMedia",
            Self::Configuration => "ConfigurationError",
            Self::EncoderOpen => "EncoderOpenError",
            Self::Decode => "DecodeError",
            Self::DestinationWrite => "DestinationWriteError",
            Self::Interrupted => "Interrupted",
            Self::Panicked => "Panicked",
        };
        f.write_str(label)
    }
}

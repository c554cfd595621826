//! 原生媒體函式庫的邊界
//!
//! 解碼與編碼本身由外部函式庫提供，這裡只定義管線需要的介面：
//! 開啟解碼、查詢資訊、逐幀讀取、開啟編碼、逐幀寫入、關閉。
//! 關閉由 `Drop` 負責，所以任何提早返回的路徑都會釋放 handle。

use crate::error::PipelineError;
use std::path::Path;

/// 每個像素的通道數（packed BGR24）
pub const CHANNELS: usize = 3;

/// 一個解碼後的影格，像素以 packed BGR24 儲存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub const fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// 所有樣本都是同一個值的影格
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::new(width, height, vec![value; Self::byte_len(width, height)])
    }

    #[must_use]
    pub const fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::byte_len(self.width, self.height)
    }
}

/// 不解碼像素即可取得的影片資訊
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub frame_rate: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    /// 容器的 comment 標籤；縮時輸出在這裡記錄來源識別
    pub comment: Option<String>,
}

impl MediaInfo {
    /// `frame_count / frame_rate`；容器中的幀數可能只是估計值
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }
}

/// 開啟編碼時的輸出參數
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// 寫入容器 comment 標籤的文字
    pub comment: String,
}

/// 已開啟的解碼 handle
pub trait FrameSource: Send {
    fn info(&self) -> &MediaInfo;

    /// `Ok(None)` 代表串流結束
    fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError>;
}

/// 已開啟的編碼 handle
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), PipelineError>;

    /// 完成容器並釋放 handle
    fn finish(self: Box<Self>) -> Result<(), PipelineError>;
}

pub trait MediaBackend: Send + Sync {
    /// 短暫開啟檔案讀取幀率、幀數與尺寸，不解碼任何影格
    fn probe(&self, path: &Path) -> Result<MediaInfo, PipelineError>;

    fn open_decoder(&self, path: &Path) -> Result<Box<dyn FrameSource>, PipelineError>;

    fn open_encoder(
        &self,
        path: &Path,
        settings: &EncodeSettings,
    ) -> Result<Box<dyn FrameSink>, PipelineError>;
}

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 封存根目錄 + 日期資料夾 + 檔名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDestination {
    pub root: PathBuf,
    /// `YYYY-MM-DD`，以本地時區計算
    pub date_folder: String,
    pub file_name: OsString,
}

impl ArchiveDestination {
    #[must_use]
    pub fn folder(&self) -> PathBuf {
        self.root.join(&self.date_folder)
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.folder().join(&self.file_name)
    }
}

#[must_use]
pub fn date_folder_name(captured_at: SystemTime) -> String {
    DateTime::<Local>::from(captured_at)
        .format("%Y-%m-%d")
        .to_string()
}

/// 與來源同資料夾的縮時輸出：`{stem}_{N}x_timelapse.{ext}`
#[must_use]
pub fn beside_source_path(source: &Path, speed_up_factor: u32) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_{speed_up_factor}x_timelapse");
    if let Some(ext) = source.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    source.with_file_name(name)
}

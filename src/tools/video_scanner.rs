use crate::error::PipelineError;
use crate::tools::{MediaBackend, resolve_path};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// 掃描到的單一影片
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    /// 檔案建立時間；檔案系統不支援時使用修改時間
    pub captured_at: SystemTime,
    pub frame_rate: f64,
    pub frame_count: u64,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

impl VideoAsset {
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }
}

/// 因無法讀取而排除的檔案
#[derive(Debug, Clone, Serialize)]
pub struct ScanExclusion {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub assets: Vec<VideoAsset>,
    pub excluded: Vec<ScanExclusion>,
}

/// 讀取檔案系統資訊與媒體資訊，幀率 <= 0 視為無法使用
pub fn probe_asset(path: &Path, backend: &dyn MediaBackend) -> Result<VideoAsset, PipelineError> {
    let metadata = std::fs::metadata(path).map_err(|e| PipelineError::unreadable(path, e))?;
    let captured_at = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|e| PipelineError::unreadable(path, e))?;

    let info = backend.probe(path)?;
    if !info.frame_rate.is_finite() || info.frame_rate <= 0.0 {
        return Err(PipelineError::unreadable(
            path,
            format!("幀率無效: {}", info.frame_rate),
        ));
    }

    Ok(VideoAsset {
        path: path.to_path_buf(),
        captured_at,
        frame_rate: info.frame_rate,
        frame_count: info.frame_count,
        width: info.width,
        height: info.height,
        size: metadata.len(),
    })
}

/// 遞迴掃描多個根目錄，依副檔名過濾
///
/// 根目錄與排除的資料夾都先轉為絕對路徑，相對路徑與 `..` 不影響排除比對
pub struct VolumeScanner {
    roots: Vec<PathBuf>,
    extensions: HashSet<String>,
    excluded_dirs: Vec<PathBuf>,
}

impl VolumeScanner {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            roots: roots.iter().map(|root| resolve_path(root)).collect(),
            extensions,
            excluded_dirs: Vec::new(),
        }
    }

    /// 略過此資料夾底下的所有檔案（例如封存根目錄本身）
    #[must_use]
    pub fn exclude_dir(mut self, dir: &Path) -> Self {
        self.excluded_dirs.push(resolve_path(dir));
        self
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// 候選檔案的惰性序列；每次呼叫都從頭開始走訪
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.roots.iter().flat_map(move |root| {
            WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_entry(move |entry| !self.is_excluded(entry.path()))
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("無法讀取目錄項目: {e}");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(move |entry| self.matches_extension(entry.path()))
                .map(walkdir::DirEntry::into_path)
        })
    }

    /// 掃描並平行讀取媒體資訊，無法讀取的檔案記錄後排除
    pub fn scan(&self, backend: &dyn MediaBackend) -> ScanResult {
        for root in &self.roots {
            info!("開始掃描目錄: {}", root.display());
        }

        let probed: Vec<Result<VideoAsset, ScanExclusion>> = self
            .candidates()
            .par_bridge()
            .map(|path| {
                probe_asset(&path, backend).map_err(|e| {
                    warn!("排除無法讀取的檔案 {}: {}", path.display(), e);
                    ScanExclusion {
                        path,
                        reason: e.to_string(),
                    }
                })
            })
            .collect();

        let mut result = ScanResult::default();
        for entry in probed {
            match entry {
                Ok(asset) => {
                    debug!(
                        "找到影片 {} ({:.1}s, {} 幀)",
                        asset.path.display(),
                        asset.duration_seconds(),
                        asset.frame_count
                    );
                    result.assets.push(asset);
                }
                Err(exclusion) => result.excluded.push(exclusion),
            }
        }

        result.assets.sort_by_key(|asset| asset.size);
        result.excluded.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "掃描完成：{} 個影片，排除 {} 個",
            result.assets.len(),
            result.excluded.len()
        );
        result
    }
}

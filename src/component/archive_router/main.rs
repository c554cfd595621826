use super::destination::{ArchiveDestination, date_folder_name};
use crate::component::duration_classifier::Disposition;
use crate::component::timelapse_encoder::EncodeSummary;
use crate::config::{RelocationMode, RunConfig};
use crate::error::PipelineError;
use crate::tools::{
    Claim, VideoAsset, claim_destination, copy_staged, ensure_directory_exists, move_file,
    same_content, write_staged,
};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// 放置的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement<T = ()> {
    /// 寫入 `path`；同名檔案內容不同時 `path` 會是編號名稱
    Placed { path: PathBuf, bytes: u64, value: T },
    /// 目的地已有相同內容的檔案，來源不動
    AlreadyArchived(PathBuf),
}

/// 佔用 `destination` 後透過暫存檔寫入編碼輸出
///
/// `matches_existing` 判斷同名的既有輸出是否就是這次要產生的結果
pub fn place_encoded(
    destination: &Path,
    matches_existing: impl FnMut(&Path) -> bool,
    encode: impl FnOnce(&Path) -> Result<EncodeSummary, PipelineError>,
) -> Result<Placement<EncodeSummary>, PipelineError> {
    let reservation = match claim_destination(destination, matches_existing)? {
        Claim::Existing(path) => {
            info!("已有相同的縮時輸出，略過: {}", path.display());
            return Ok(Placement::AlreadyArchived(path));
        }
        Claim::Reserved(reservation) => reservation,
    };

    let path = reservation.path().to_path_buf();
    let (summary, bytes) = write_staged(reservation, encode)?;
    Ok(Placement::Placed {
        path,
        bytes,
        value: summary,
    })
}

/// 依拍攝日期把影片放進封存資料夾
#[derive(Debug, Clone)]
pub struct ArchiveRouter {
    root: PathBuf,
    relocation_mode: RelocationMode,
    retain_source: bool,
    timelapse_prefix: String,
}

impl ArchiveRouter {
    #[must_use]
    pub const fn new(
        root: PathBuf,
        relocation_mode: RelocationMode,
        retain_source: bool,
        timelapse_prefix: String,
    ) -> Self {
        Self {
            root,
            relocation_mode,
            retain_source,
            timelapse_prefix,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, PipelineError> {
        let root = config
            .archive_root_path
            .clone()
            .ok_or_else(|| PipelineError::configuration("未設定封存根目錄 (archiveRootPath)"))?;
        Ok(Self::new(
            root,
            config.relocation_mode,
            config.timelapse_retain_source,
            config.timelapse_prefix.clone(),
        ))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 計算目的地但不碰檔案系統；`Skip` 沒有目的地
    #[must_use]
    pub fn destination(
        &self,
        asset: &VideoAsset,
        disposition: Disposition,
    ) -> Option<ArchiveDestination> {
        let base_name = asset.path.file_name()?;
        let file_name = match disposition {
            Disposition::Skip => return None,
            Disposition::RelocateVerbatim => base_name.to_os_string(),
            Disposition::Timelapse { .. } => {
                let mut name = OsString::from(&self.timelapse_prefix);
                name.push(base_name);
                name
            }
        };

        Some(ArchiveDestination {
            root: self.root.clone(),
            date_folder: date_folder_name(asset.captured_at),
            file_name,
        })
    }

    /// 計算目的地並建立日期資料夾（已存在時不做任何事）
    pub fn route(
        &self,
        asset: &VideoAsset,
        disposition: Disposition,
    ) -> Result<Option<ArchiveDestination>, PipelineError> {
        let Some(destination) = self.destination(asset, disposition) else {
            return Ok(None);
        };

        let folder = destination.folder();
        ensure_directory_exists(&folder)
            .map_err(|e| PipelineError::destination_write(&folder, e))?;
        debug!("目的地: {}", destination.path().display());

        Ok(Some(destination))
    }

    /// 原樣搬移或複製；同名且內容相同的檔案已存在時不做任何事
    pub fn relocate(
        &self,
        asset: &VideoAsset,
        destination: &ArchiveDestination,
    ) -> Result<Placement, PipelineError> {
        let claim = claim_destination(&destination.path(), |existing| {
            same_content(&asset.path, existing).unwrap_or_else(|e| {
                warn!("無法比對 {}: {}", existing.display(), e);
                false
            })
        })?;
        let reservation = match claim {
            Claim::Existing(path) => {
                info!("目的地已有相同內容，略過: {}", path.display());
                return Ok(Placement::AlreadyArchived(path));
            }
            Claim::Reserved(reservation) => reservation,
        };

        let target = reservation.path().to_path_buf();
        let bytes = match self.relocation_mode {
            RelocationMode::Move => move_file(&asset.path, reservation)?,
            RelocationMode::Copy => copy_staged(&asset.path, reservation)?,
        };

        info!(
            "已{}: {} -> {}",
            match self.relocation_mode {
                RelocationMode::Move => "移動",
                RelocationMode::Copy => "複製",
            },
            asset.path.display(),
            target.display()
        );
        Ok(Placement::Placed {
            path: target,
            bytes,
            value: (),
        })
    }

    /// 寫入縮時輸出；完整編碼成功後才依設定刪除來源
    pub fn place_timelapse(
        &self,
        asset: &VideoAsset,
        destination: &ArchiveDestination,
        matches_existing: impl FnMut(&Path) -> bool,
        encode: impl FnOnce(&Path) -> Result<EncodeSummary, PipelineError>,
    ) -> Result<Placement<EncodeSummary>, PipelineError> {
        let placement = place_encoded(&destination.path(), matches_existing, encode)?;

        if let Placement::Placed { value: summary, .. } = &placement
            && !self.retain_source
        {
            if summary.warning.is_some() {
                warn!("縮時只完成部分，保留來源: {}", asset.path.display());
            } else {
                match fs::remove_file(&asset.path) {
                    Ok(()) => debug!("已刪除來源: {}", asset.path.display()),
                    Err(e) => warn!("刪除來源失敗 {}: {}", asset.path.display(), e),
                }
            }
        }
        Ok(placement)
    }
}

//! 目的地檔案的佔用與暫存寫入
//!
//! 目的地先以 `create_new` 佔用，名稱已被其他內容占用時改用 `name (1).ext` 等編號名稱，
//! 任何寫入都不會覆蓋既有檔案。內容先寫到同資料夾下的隱藏暫存檔，成功後才 rename
//! 到佔用的名稱；失敗時刪除暫存檔與佔位檔。

use crate::error::PipelineError;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 同名衝突時最多嘗試的編號
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// 與 `destination` 同資料夾的暫存檔路徑
#[must_use]
pub fn staging_path(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let staged = format!(".{file_name}.{}.partial", uuid::Uuid::new_v4().simple());
    destination.with_file_name(staged)
}

/// 第 `n` 個候選名稱：`clip.mp4`、`clip (1).mp4`、`clip (2).mp4` ...
#[must_use]
pub fn numbered_path(destination: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return destination.to_path_buf();
    }
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem} ({n})");
    if let Some(ext) = destination.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    destination.with_file_name(name)
}

/// 已佔用但尚未放入內容的目的地；drop 時刪除空的佔位檔
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    placed: bool,
}

impl Reservation {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    const fn mark_placed(&mut self) {
        self.placed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.placed {
            remove_partial(&self.path);
        }
    }
}

#[derive(Debug)]
pub enum Claim {
    /// 取得一個新的名稱
    Reserved(Reservation),
    /// 已有相同內容的檔案
    Existing(PathBuf),
}

/// 佔用 `destination`；同名檔案內容相同時回傳 `Existing`，不同時改用下一個編號名稱
///
/// `is_same` 只會對已存在的候選名稱呼叫。佔用以 `create_new` 完成，
/// 多個工作同時佔用同一名稱時只有一個會成功。
pub fn claim_destination(
    destination: &Path,
    mut is_same: impl FnMut(&Path) -> bool,
) -> Result<Claim, PipelineError> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let candidate = numbered_path(destination, n);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => {
                if n > 0 {
                    info!(
                        "{} 已被不同內容使用，改用 {}",
                        destination.display(),
                        candidate.display()
                    );
                }
                return Ok(Claim::Reserved(Reservation {
                    path: candidate,
                    placed: false,
                }));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if is_same(&candidate) {
                    return Ok(Claim::Existing(candidate));
                }
            }
            Err(e) => return Err(PipelineError::destination_write(&candidate, e)),
        }
    }
    Err(PipelineError::destination_write(
        destination,
        "找不到可用的檔名",
    ))
}

/// 透過暫存檔寫入佔用的目的地，回傳寫入函式的結果與最終檔案大小
///
/// 寫入函式失敗或 panic 時，暫存檔與佔位檔都會被刪除
pub fn write_staged<T>(
    mut reservation: Reservation,
    write: impl FnOnce(&Path) -> Result<T, PipelineError>,
) -> Result<(T, u64), PipelineError> {
    let destination = reservation.path.clone();
    let mut partial = PartialFile::new(staging_path(&destination));

    let value = write(&partial.path)?;
    // 只會取代自己的空佔位檔
    fs::rename(&partial.path, &destination)
        .map_err(|e| PipelineError::destination_write(&destination, e))?;
    partial.keep();
    reservation.mark_placed();

    let size = fs::metadata(&destination)
        .map_err(|e| PipelineError::destination_write(&destination, e))?
        .len();
    Ok((value, size))
}

/// 尚未改名到最終位置的暫存檔；drop 時刪除
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    const fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    const fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.keep {
            remove_partial(&self.path);
        }
    }
}

/// 複製檔案到佔用的目的地（經由暫存檔），回傳目的地大小
pub fn copy_staged(source: &Path, reservation: Reservation) -> Result<u64, PipelineError> {
    let destination = reservation.path.clone();
    let ((), size) = write_staged(reservation, |staged| {
        fs::copy(source, staged)
            .map(|_| ())
            .map_err(|e| PipelineError::destination_write(&destination, e))
    })?;
    Ok(size)
}

/// 移動檔案到佔用的目的地；跨檔案系統時改為複製後刪除
pub fn move_file(source: &Path, mut reservation: Reservation) -> Result<u64, PipelineError> {
    let destination = reservation.path.clone();
    match fs::rename(source, &destination) {
        Ok(()) => {
            reservation.mark_placed();
            fs::metadata(&destination)
                .map(|m| m.len())
                .map_err(|e| PipelineError::destination_write(&destination, e))
        }
        Err(e) => {
            debug!(
                "rename 失敗，改用複製後刪除 {}: {}",
                source.display(),
                e
            );
            copy_and_delete(source, reservation)
        }
    }
}

/// 複製檔案後刪除原檔案
fn copy_and_delete(source: &Path, reservation: Reservation) -> Result<u64, PipelineError> {
    let size = copy_staged(source, reservation)?;
    if let Err(e) = fs::remove_file(source) {
        // 目的地已完整，來源刪不掉只影響空間
        warn!("刪除原檔案失敗 {}: {}", source.display(), e);
    }
    Ok(size)
}

fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!("已刪除未完成的檔案: {}", path.display()),
        Err(e) => warn!("無法刪除未完成的檔案 {}: {}", path.display(), e),
    }
}

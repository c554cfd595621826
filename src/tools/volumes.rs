use log::{debug, info};
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// 已掛載的卸除式磁碟區
///
/// 封存根目錄所在的磁碟區不列入，避免把輸出再掃描一次
#[must_use]
pub fn removable_mount_points(archive_root: Option<&Path>) -> Vec<PathBuf> {
    let disks = Disks::new_with_refreshed_list();
    let mounts = disks.iter().map(|disk| {
        debug!(
            "磁碟區 {} (removable: {})",
            disk.mount_point().display(),
            disk.is_removable()
        );
        (disk.mount_point().to_path_buf(), disk.is_removable())
    });

    let selected = select_removable(mounts, archive_root);
    info!("找到 {} 個卸除式磁碟區", selected.len());
    selected
}

fn select_removable(
    mounts: impl Iterator<Item = (PathBuf, bool)>,
    archive_root: Option<&Path>,
) -> Vec<PathBuf> {
    let mut selected: Vec<PathBuf> = mounts
        .filter(|(_, removable)| *removable)
        .map(|(mount, _)| mount)
        .filter(|mount| archive_root.is_none_or(|root| !root.starts_with(mount)))
        .collect();
    selected.sort();
    selected.dedup();
    selected
}

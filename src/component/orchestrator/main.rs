use super::metrics::{RunMetrics, UnitOutcome};
use super::report::RunReport;
use crate::component::archive_router::{
    ArchiveRouter, Placement, beside_source_path, place_encoded,
};
use crate::component::duration_classifier::{Disposition, classify};
use crate::component::timelapse_encoder::{EncodeSummary, TimelapseEncoder, TimelapseJob};
use crate::config::RunConfig;
use crate::error::{FailureKind, PipelineError};
use crate::tools::{
    MediaBackend, ScanExclusion, ScanResult, VideoAsset, VolumeScanner, probe_asset,
    removable_mount_points, resolve_path, validate_directory_exists,
};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Scanning,
    Dispatching,
    Aggregating,
    Reporting,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scanning => "Scanning",
            Self::Dispatching => "Dispatching",
            Self::Aggregating => "Aggregating",
            Self::Reporting => "Reporting",
        };
        f.write_str(label)
    }
}

/// 結果要放到哪裡
#[derive(Debug, Clone)]
pub enum DispatchMode {
    /// 依日期放進封存根目錄
    Archive(ArchiveRouter),
    /// 縮時輸出放在來源旁邊，來源一律保留；`factor` 為 `None` 時依長度分類
    BesideSource { factor: Option<u32> },
}

pub struct Orchestrator {
    config: RunConfig,
    backend: Arc<dyn MediaBackend>,
    shutdown_signal: Arc<AtomicBool>,
    show_progress: bool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: RunConfig,
        backend: Arc<dyn MediaBackend>,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            backend,
            shutdown_signal,
            show_progress: true,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 掃描所有根目錄，分類後把影片搬進封存資料夾或產生縮時影片
    ///
    /// 只有設定錯誤與執行緒池建立失敗會回傳 `Err`；單一檔案的錯誤記錄在報告中。
    pub fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        self.config.validate()?;
        let router = ArchiveRouter::from_config(&self.config)?;
        let roots = self.scan_roots()?;

        Self::enter(RunPhase::Scanning);
        // 封存根目錄若在掃描範圍內，避免重複處理先前的輸出
        let scan = VolumeScanner::new(roots, &self.config.extensions)
            .exclude_dir(router.root())
            .scan(self.backend.as_ref());

        self.dispatch(scan, &DispatchMode::Archive(router), started)
    }

    /// 對指定的檔案產生縮時影片，輸出放在來源旁
    pub fn speed(&self, files: &[PathBuf], factor: Option<u32>) -> Result<RunReport> {
        let started = Instant::now();
        self.config.validate()?;
        if factor == Some(0) {
            return Err(PipelineError::configuration("加速倍率必須至少為 1").into());
        }

        Self::enter(RunPhase::Scanning);
        let mut scan = ScanResult::default();
        for path in files {
            match probe_asset(path, self.backend.as_ref()) {
                Ok(asset) => scan.assets.push(asset),
                Err(e) => {
                    warn!("排除無法讀取的檔案 {}: {}", path.display(), e);
                    scan.excluded.push(ScanExclusion {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.dispatch(scan, &DispatchMode::BesideSource { factor }, started)
    }

    fn enter(phase: RunPhase) {
        info!("進入階段: {phase}");
    }

    fn scan_roots(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut roots = Vec::with_capacity(self.config.scan_root_paths.len());
        for root in &self.config.scan_root_paths {
            validate_directory_exists(root).map_err(PipelineError::configuration)?;
            roots.push(resolve_path(root));
        }
        if self.config.use_removable_volumes {
            roots.extend(
                removable_mount_points(self.config.archive_root_path.as_deref())
                    .into_iter()
                    .map(|root| resolve_path(&root)),
            );
        }
        roots.sort();
        roots.dedup();

        if roots.is_empty() {
            return Err(PipelineError::configuration(
                "沒有任何掃描根目錄 (scanRootPaths 或可移除磁碟)",
            ));
        }
        Ok(roots)
    }

    fn disposition_for(
        &self,
        asset: &VideoAsset,
        mode: &DispatchMode,
    ) -> Result<Disposition, PipelineError> {
        match mode {
            DispatchMode::BesideSource {
                factor: Some(speed_up_factor),
            } => Ok(Disposition::Timelapse {
                speed_up_factor: *speed_up_factor,
            }),
            _ => classify(asset.duration_seconds(), &self.config.thresholds()),
        }
    }

    fn dispatch(
        &self,
        scan: ScanResult,
        mode: &DispatchMode,
        started: Instant,
    ) -> Result<RunReport> {
        Self::enter(RunPhase::Dispatching);

        let mut metrics = RunMetrics {
            scanned_bytes: scan.assets.iter().map(|a| a.size).sum(),
            ..RunMetrics::default()
        };

        let mut units = Vec::with_capacity(scan.assets.len());
        for asset in scan.assets {
            let disposition = self.disposition_for(&asset, mode)?;
            metrics.dispositions.count(disposition);
            let needs_work = !matches!(
                (mode, disposition),
                (_, Disposition::Skip)
                    | (DispatchMode::BesideSource { .. }, Disposition::RelocateVerbatim)
            );
            if needs_work {
                units.push((asset, disposition));
            } else {
                metrics.absorb(&asset.path, UnitOutcome::Untouched);
            }
        }

        let pool_size = self.config.effective_pool_size();
        info!("派發 {} 個工作，工作執行緒 {}", units.len(), pool_size);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_size)
            .build()
            .context("無法建立工作執行緒池")?;

        let progress_bar = self.progress_bar(units.len() as u64);
        let metrics = Mutex::new(metrics);

        pool.install(|| {
            units.par_iter().for_each(|(asset, disposition)| {
                let outcome = if self.shutdown_signal.load(Ordering::SeqCst) {
                    UnitOutcome::Failed {
                        kind: FailureKind::Interrupted,
                        reason: "收到中斷信號，未開始處理".to_string(),
                    }
                } else {
                    progress_bar.set_message(file_name(&asset.path));
                    self.run_unit(asset, *disposition, mode)
                };

                metrics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .absorb(&asset.path, outcome);
                progress_bar.inc(1);
            });
        });
        progress_bar.finish_with_message("完成");

        Self::enter(RunPhase::Aggregating);
        let mut metrics = metrics.into_inner().unwrap_or_else(PoisonError::into_inner);
        metrics.sort();
        metrics.elapsed_seconds = started.elapsed().as_secs_f64();

        Self::enter(RunPhase::Reporting);
        Ok(RunReport::new(metrics, scan.excluded))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        ) {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar
    }

    /// 工作單元邊界：任何錯誤或 panic 都只影響這個檔案
    fn run_unit(
        &self,
        asset: &VideoAsset,
        disposition: Disposition,
        mode: &DispatchMode,
    ) -> UnitOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.process(asset, disposition, mode)));

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("處理失敗 {}: {}", asset.path.display(), e);
                e.into()
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("處理時發生 panic {}: {}", asset.path.display(), reason);
                UnitOutcome::Failed {
                    kind: FailureKind::Panicked,
                    reason,
                }
            }
        }
    }

    fn process(
        &self,
        asset: &VideoAsset,
        disposition: Disposition,
        mode: &DispatchMode,
    ) -> Result<UnitOutcome, PipelineError> {
        let encoder = TimelapseEncoder::new(self.backend.as_ref());

        match (mode, disposition) {
            (_, Disposition::Skip)
            | (DispatchMode::BesideSource { .. }, Disposition::RelocateVerbatim) => {
                Ok(UnitOutcome::Untouched)
            }
            (DispatchMode::Archive(router), Disposition::RelocateVerbatim) => {
                let Some(destination) = router.route(asset, disposition)? else {
                    return Ok(UnitOutcome::Untouched);
                };
                Ok(match router.relocate(asset, &destination)? {
                    Placement::Placed { bytes, .. } => UnitOutcome::Relocated {
                        original_bytes: asset.size,
                        new_bytes: bytes,
                    },
                    Placement::AlreadyArchived(_) => UnitOutcome::AlreadyArchived,
                })
            }
            (DispatchMode::Archive(router), Disposition::Timelapse { speed_up_factor }) => {
                let Some(destination) = router.route(asset, disposition)? else {
                    return Ok(UnitOutcome::Untouched);
                };
                let job = TimelapseJob::new(
                    asset,
                    destination.path(),
                    speed_up_factor,
                    self.config.output_frame_rate,
                )?;
                let placement = router.place_timelapse(
                    asset,
                    &destination,
                    |existing| self.is_output_of(existing, &job, asset),
                    |staged| encoder.encode(&job, staged),
                )?;
                Ok(timelapse_outcome(asset, placement))
            }
            (DispatchMode::BesideSource { .. }, Disposition::Timelapse { speed_up_factor }) => {
                let target = beside_source_path(&asset.path, speed_up_factor);
                let job = TimelapseJob::new(
                    asset,
                    target.clone(),
                    speed_up_factor,
                    self.config.output_frame_rate,
                )?;
                let placement = place_encoded(
                    &target,
                    |existing| self.is_output_of(existing, &job, asset),
                    |staged| encoder.encode(&job, staged),
                )?;
                if let Placement::Placed { path, .. } = &placement {
                    info!("已輸出: {}", path.display());
                }
                Ok(timelapse_outcome(asset, placement))
            }
        }
    }

    /// 同名的既有檔案是否就是 `job` 會產生的完整縮時輸出
    fn is_output_of(&self, existing: &Path, job: &TimelapseJob, asset: &VideoAsset) -> bool {
        self.backend
            .probe(existing)
            .is_ok_and(|info| job.matches_output(&info, asset.frame_count))
    }
}

fn timelapse_outcome(asset: &VideoAsset, placement: Placement<EncodeSummary>) -> UnitOutcome {
    match placement {
        Placement::Placed {
            bytes,
            value: summary,
            ..
        } => UnitOutcome::Timelapsed {
            original_bytes: asset.size,
            new_bytes: bytes,
            warning: summary.warning,
        },
        Placement::AlreadyArchived(_) => UnitOutcome::AlreadyArchived,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "未知的 panic".to_string())
}

//! 命令列參數；`run` 的旗標覆蓋設定檔中的值

use crate::config::{RelocationMode, RunConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "timelapse-archiver", version)]
#[command(about = "Archive videos by date and turn long recordings into frame-averaged timelapses")]
pub struct Cli {
    /// JSON configuration file (default: ./timelapse_archiver.json when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan volumes, classify by duration, archive and timelapse
    Run(RunArgs),

    /// Timelapse the given files, writing output beside each source
    Speed(SpeedArgs),

    /// Print metadata and the disposition each file would receive
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write the default configuration as JSON
    InitConfig { path: PathBuf },
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Root directory to scan (repeatable)
    #[arg(long = "scan-root")]
    pub scan_roots: Vec<PathBuf>,

    /// Archive root; outputs go to <root>/<YYYY-MM-DD>/
    #[arg(long)]
    pub archive_root: Option<PathBuf>,

    /// Also scan every removable volume
    #[arg(long)]
    pub removable_volumes: bool,

    /// Videos shorter than this (seconds) are left untouched
    #[arg(long)]
    pub skip_below: Option<f64>,

    /// Videos longer than this (seconds) become timelapses
    #[arg(long)]
    pub timelapse_above: Option<f64>,

    /// Target timelapse length in seconds
    #[arg(long)]
    pub desired_duration: Option<f64>,

    /// Output frame rate of timelapses
    #[arg(long)]
    pub output_fps: Option<f64>,

    /// Number of parallel workers (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// How verbatim videos reach the archive
    #[arg(long, value_enum)]
    pub relocation: Option<RelocationMode>,

    /// Delete the source after a successful timelapse
    #[arg(long)]
    pub discard_source: bool,

    /// Also write the report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    /// 把有指定的旗標套用到設定上
    pub fn apply(&self, config: &mut RunConfig) {
        if !self.scan_roots.is_empty() {
            config.scan_root_paths.clone_from(&self.scan_roots);
        }
        if let Some(root) = &self.archive_root {
            config.archive_root_path = Some(root.clone());
        }
        if self.removable_volumes {
            config.use_removable_volumes = true;
        }
        if let Some(value) = self.skip_below {
            config.skip_below_seconds = value;
        }
        if let Some(value) = self.timelapse_above {
            config.timelapse_above_seconds = value;
        }
        if let Some(value) = self.desired_duration {
            config.desired_output_duration_seconds = value;
        }
        if let Some(value) = self.output_fps {
            config.output_frame_rate = value;
        }
        if let Some(workers) = self.workers {
            config.worker_pool_size = Some(workers);
        }
        if let Some(mode) = self.relocation {
            config.relocation_mode = mode;
        }
        if self.discard_source {
            config.timelapse_retain_source = false;
        }
    }
}

#[derive(Debug, Args)]
pub struct SpeedArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Average this many frames into one; classify by duration when omitted
    #[arg(short, long)]
    pub factor: Option<u32>,

    /// Number of parallel workers (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Also write the report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

use anyhow::Result;
use clap::Parser;
use console::style;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use timelapse_archiver::cli::{Cli, Command, RunArgs, SpeedArgs};
use timelapse_archiver::component::{Orchestrator, RunReport, classify};
use timelapse_archiver::config::RunConfig;
use timelapse_archiver::init;
use timelapse_archiver::signal::setup_shutdown_signal;
use timelapse_archiver::tools::{FfmpegBackend, probe_asset};

/// 執行層級的錯誤（設定錯誤、無法建立執行緒池等）
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init::init(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = RunConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run_pipeline(config, &args),
        Command::Speed(args) => run_speed(config, &args),
        Command::Probe { files } => Ok(probe_files(&config, &files)),
        Command::InitConfig { path } => {
            RunConfig::default().save_to_file(&path)?;
            println!("{}", style(format!("已寫入設定檔: {}", path.display())).green());
            Ok(0)
        }
    }
}

fn run_pipeline(mut config: RunConfig, args: &RunArgs) -> Result<u8> {
    args.apply(&mut config);
    let shutdown_signal = setup_shutdown_signal()?;

    println!("{}", style("=== 影片封存與縮時 ===").cyan().bold());
    let orchestrator = Orchestrator::new(config, Arc::new(FfmpegBackend::new()), shutdown_signal)
        .with_progress(!args.no_progress);
    let report = orchestrator.run()?;

    finish(&report, args.report_json.as_deref())
}

fn run_speed(mut config: RunConfig, args: &SpeedArgs) -> Result<u8> {
    if let Some(workers) = args.workers {
        config.worker_pool_size = Some(workers);
    }
    let shutdown_signal = setup_shutdown_signal()?;

    println!("{}", style("=== 縮時 ===").cyan().bold());
    let orchestrator = Orchestrator::new(config, Arc::new(FfmpegBackend::new()), shutdown_signal)
        .with_progress(!args.no_progress);
    let report = orchestrator.speed(&args.files, args.factor)?;

    finish(&report, args.report_json.as_deref())
}

fn finish(report: &RunReport, report_json: Option<&Path>) -> Result<u8> {
    report.print_summary();
    if let Some(path) = report_json {
        report.write_json(path)?;
    }
    Ok(report.exit_code())
}

fn probe_files(config: &RunConfig, files: &[PathBuf]) -> u8 {
    let backend = FfmpegBackend::new();
    let thresholds = config.thresholds();
    let mut failed = 0;

    for path in files {
        match probe_asset(path, &backend) {
            Ok(asset) => {
                let disposition = classify(asset.duration_seconds(), &thresholds)
                    .map_or_else(|e| e.to_string(), |d| d.to_string());
                println!("{}", style(path.display()).bold());
                println!(
                    "  {:.3} fps, {} 幀, {}x{}, {:.1} 秒, {:.2} MB",
                    asset.frame_rate,
                    asset.frame_count,
                    asset.width,
                    asset.height,
                    asset.duration_seconds(),
                    asset.size as f64 / 1024.0 / 1024.0
                );
                println!("  處理方式: {}", style(disposition).cyan());
            }
            Err(e) => {
                failed += 1;
                println!("{} {}", style("✗").red(), e);
            }
        }
    }

    info!("讀取 {} 個檔案，失敗 {failed} 個", files.len());
    u8::from(failed > 0)
}

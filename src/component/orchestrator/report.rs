use super::metrics::RunMetrics;
use crate::tools::ScanExclusion;
use anyhow::{Context, Result};
use console::style;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::Path;

const GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// 執行結束後的報告，失敗清單一定會完整列出
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    #[serde(flatten)]
    pub metrics: RunMetrics,
    /// 掃描時因無法讀取而排除的檔案，不算失敗
    pub excluded: Vec<ScanExclusion>,
}

impl RunReport {
    #[must_use]
    pub const fn new(metrics: RunMetrics, excluded: Vec<ScanExclusion>) -> Self {
        Self { metrics, excluded }
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.metrics.failed.is_empty()
    }

    /// 0：沒有失敗；1：至少一個工作單元失敗或被中斷
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.has_failures())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("無法序列化執行報告")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("無法寫入報告: {}", path.display()))?;
        info!("已寫入報告: {}", path.display());
        Ok(())
    }

    pub fn print_summary(&self) {
        let m = &self.metrics;

        println!();
        println!("{}", style("=== 執行摘要 ===").cyan().bold());
        println!(
            "  分類: 略過 {} / 原樣搬移 {} / 縮時 {}",
            m.dispositions.skip, m.dispositions.relocate_verbatim, m.dispositions.timelapse
        );
        println!("  搬移完成: {} 個", style(m.relocated).green());
        println!("  縮時完成: {} 個", style(m.timelapsed).green());
        if m.already_archived > 0 {
            println!("  已封存過: {} 個", style(m.already_archived).dim());
        }
        println!(
            "  原始大小: {:.2} GB -> 新大小: {:.2} GB (掃描 {:.2} GB)",
            m.original_bytes as f64 / GIGABYTE,
            m.new_bytes as f64 / GIGABYTE,
            m.scanned_bytes as f64 / GIGABYTE
        );
        println!("  耗時: {:.2} 秒", m.elapsed_seconds);

        if !m.partial.is_empty() {
            println!();
            println!(
                "{}",
                style(format!("部分完成 {} 個：", m.partial.len())).yellow()
            );
            for partial in &m.partial {
                println!("  {} - {}", partial.path.display(), partial.warning);
            }
        }

        if !self.excluded.is_empty() {
            println!();
            println!(
                "{}",
                style(format!("掃描時排除 {} 個：", self.excluded.len())).dim()
            );
            for exclusion in &self.excluded {
                println!("  {} - {}", exclusion.path.display(), exclusion.reason);
            }
        }

        if !m.failed.is_empty() {
            println!();
            println!("{}", style(format!("失敗 {} 個：", m.failed.len())).red());
            for failed in &m.failed {
                println!(
                    "  {} [{}] {}",
                    failed.path.display(),
                    failed.kind,
                    failed.reason
                );
            }
        }

        info!(
            "執行完成 - 成功: {}, 失敗: {}, 排除: {}",
            m.succeeded(),
            m.failed.len(),
            self.excluded.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::orchestrator::metrics::UnitOutcome;
    use crate::error::FailureKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn report_with_failure() -> RunReport {
        let mut metrics = RunMetrics::default();
        metrics.absorb(
            Path::new("/videos/bad.mp4"),
            UnitOutcome::Failed {
                kind: FailureKind::Decode,
                reason: "corrupt".to_string(),
            },
        );
        RunReport::new(metrics, Vec::new())
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(RunReport::new(RunMetrics::default(), Vec::new()).exit_code(), 0);
        assert_eq!(report_with_failure().exit_code(), 1);
    }

    #[test]
    fn test_exclusions_do_not_fail_run() {
        let excluded = vec![ScanExclusion {
            path: PathBuf::from("/videos/zero_fps.mp4"),
            reason: "fps=0".to_string(),
        }];
        assert_eq!(RunReport::new(RunMetrics::default(), excluded).exit_code(), 0);
    }

    #[test]
    fn test_json_keys() {
        let json: serde_json::Value =
            serde_json::from_str(&report_with_failure().to_json().unwrap()).unwrap();

        assert_eq!(json["originalBytes"], 0);
        assert_eq!(json["dispositions"]["relocateVerbatim"], 0);
        assert_eq!(json["failed"][0]["kind"], "decode");
        assert_eq!(json["failed"][0]["path"], "/videos/bad.mp4");
        assert!(json["excluded"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        report_with_failure().write_json(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"failed\""));
    }
}

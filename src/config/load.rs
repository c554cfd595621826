use crate::config::types::{DEFAULT_CONFIG_FILE, RunConfig};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

impl RunConfig {
    /// 載入設定
    ///
    /// 明確指定的檔案必須存在；未指定時使用工作目錄下的
    /// `timelapse_archiver.json`，不存在則使用預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("設定檔不存在: {}", path.display());
                }
                Self::load_from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }
}

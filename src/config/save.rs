use crate::config::types::RunConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl RunConfig {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }
}

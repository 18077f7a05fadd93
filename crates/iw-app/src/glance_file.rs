//! Launcher summary backed by a JSON file that a launcher can poll.

use std::path::{Path, PathBuf};

use anyhow::Context;
use iw_weather::{GlanceSlice, LauncherSummary};

#[derive(Debug, Clone)]
pub struct FileGlance {
    path: PathBuf,
}

impl FileGlance {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last published slice, if any.
    pub fn read(&self) -> anyhow::Result<Option<GlanceSlice>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let slice = serde_json::from_str(&contents).context("Failed to parse app glance")?;
        Ok(Some(slice))
    }
}

impl LauncherSummary for FileGlance {
    fn publish(&mut self, slice: GlanceSlice) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create glance directory")?;
        }
        let contents = serde_json::to_string_pretty(&slice).context("Failed to serialize app glance")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

use crate::domain::trading::trader_state::TraderState;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON snapshot of the trader state on disk.
pub struct StateStore {
    file_path: PathBuf,
}

impl StateStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// `None` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<TraderState>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read state file {:?}", self.file_path))?;
        let state: TraderState =
            serde_json::from_str(&content).context("Failed to parse state JSON")?;

        info!(
            "Loaded state from {:?} ({} open positions, {} closed trades)",
            self.file_path,
            state.open_positions.len(),
            state.trade_history.len()
        );
        Ok(Some(state))
    }

    pub fn save(&self, state: &TraderState) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }

        let content = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

        // Write to a temp file then rename so readers never see a partial snapshot.
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp state file")?;
        fs::rename(&temp_path, &self.file_path).context("Failed to rename state file")?;

        debug!("Saved state to {:?}", self.file_path);
        Ok(())
    }
}

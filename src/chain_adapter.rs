use std::fs;
use std::path::{Path, PathBuf};

use swap_sdk::{ChainSnapshot, LinearCostModel, MemoryChain};
use thiserror::Error;

const CHAIN_FILE: &str = "chain_snapshot.json";

#[derive(Debug, Error)]
pub enum ChainAdapterError {
    #[error("io error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("chain error: {0}")]
    Chain(String),
}

/// Adapter that backs a `swap_sdk::MemoryChain` with a JSON snapshot on disk.
pub struct SnapshotChainAdapter {
    path: PathBuf,
}

impl SnapshotChainAdapter {
    pub fn new(app_data_dir: &Path) -> Self {
        Self {
            path: app_data_dir.join(CHAIN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the chain, or an empty one if no snapshot exists yet.
    pub fn load(&self, cost_model: LinearCostModel) -> Result<MemoryChain, ChainAdapterError> {
        if !self.path.exists() {
            log::info!("no chain snapshot at {}, starting empty", self.path.display());
            return Ok(MemoryChain::with_cost_model(cost_model));
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| ChainAdapterError::Io(e.to_string()))?;
        let snapshot: ChainSnapshot = serde_json::from_str(&contents)
            .map_err(|e| ChainAdapterError::Parse(format!("{}: {e}", self.path.display())))?;
        log::debug!(
            "loaded {} resources from {}",
            snapshot.resources.len(),
            self.path.display()
        );
        Ok(MemoryChain::from_snapshot(snapshot, cost_model))
    }

    pub fn save(&self, chain: &MemoryChain) -> Result<(), ChainAdapterError> {
        let snapshot = chain
            .snapshot()
            .map_err(|e| ChainAdapterError::Chain(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ChainAdapterError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ChainAdapterError::Parse(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ChainAdapterError::Io(e.to_string()))
    }
}

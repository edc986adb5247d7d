use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use swap_sdk::Network;

const LOCAL_STATE_FILE: &str = "swap_history.json";
const CONFIG_FILE: &str = "network_config.json";

// ============================================================================
// Persisted local state (swap history)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalState {
    #[serde(default)]
    swaps: Vec<SwapRecord>,
}

/// One prepared or submitted draft, as shown in the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRecord {
    /// Draft id; also the transaction id once accepted.
    pub id: String,
    pub purpose: String,
    pub network: String,
    pub status: String,
    pub escrow_address: String,
    pub party: String,
    pub fee_bound: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Network status & app state (sent to frontend)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub network: String,
    pub is_mainnet: bool,
    pub node_url: String,
    pub base_asset_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub revision: u64,
    pub network_status: NetworkStatus,
    pub swaps: Vec<SwapRecord>,
}

// ============================================================================
// App state manager
// ============================================================================

pub struct AppStateManager {
    app_data_dir: PathBuf,
    network: Option<Network>,
    local_state: LocalState,
    revision: u64,
}

impl AppStateManager {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let local_state = Self::load_local_state(&app_data_dir).unwrap_or_default();
        Self {
            app_data_dir,
            network: None,
            local_state,
            revision: 0,
        }
    }

    /// Load the saved network config, if any.
    pub fn initialize(&mut self) {
        if let Some(network) = self.load_network_config() {
            self.network = Some(network);
        }
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub fn is_first_launch(&self) -> bool {
        !self.app_data_dir.join(CONFIG_FILE).exists()
    }

    pub fn is_initialized(&self) -> bool {
        self.network.is_some()
    }

    pub fn network(&self) -> Option<Network> {
        self.network
    }

    pub fn set_network(&mut self, network: Network) -> AppState {
        self.save_network_config(network);
        self.network = Some(network);
        self.bump_revision();
        self.snapshot()
    }

    pub fn network_status(&self) -> NetworkStatus {
        let network = self.network;
        NetworkStatus {
            network: network
                .map(|n| n.as_str().to_string())
                .unwrap_or_else(|| "unknown".into()),
            is_mainnet: network.map(|n| n.is_mainnet()).unwrap_or(false),
            node_url: network
                .map(|n| n.default_node_url().to_string())
                .unwrap_or_default(),
            base_asset_id: network
                .map(|n| n.base_asset().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> AppState {
        AppState {
            revision: self.revision,
            network_status: self.network_status(),
            swaps: self.local_state.swaps.clone(),
        }
    }

    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    pub fn swaps(&self) -> &[SwapRecord] {
        &self.local_state.swaps
    }

    pub fn upsert_swap(&mut self, swap: SwapRecord) {
        match self.local_state.swaps.iter_mut().find(|s| s.id == swap.id) {
            Some(existing) => {
                let created_at = std::mem::take(&mut existing.created_at);
                *existing = SwapRecord { created_at, ..swap };
            }
            None => self.local_state.swaps.push(swap),
        }
        self.save_local_state();
        self.bump_revision();
    }

    // --- Persistence helpers ---

    fn load_network_config(&self) -> Option<Network> {
        let path = self.app_data_dir.join(CONFIG_FILE);
        let contents = fs::read_to_string(path).ok()?;
        let config: serde_json::Value = serde_json::from_str(&contents).ok()?;
        let network_str = config.get("network")?.as_str()?;
        network_str.parse().ok()
    }

    fn save_network_config(&self, network: Network) {
        let path = self.app_data_dir.join(CONFIG_FILE);
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("failed to create {}: {e}", parent.display());
            }
        }
        let config = serde_json::json!({ "network": network.as_str() });
        if let Ok(json) = serde_json::to_string_pretty(&config) {
            if let Err(e) = fs::write(&path, json) {
                log::warn!("failed to save {}: {e}", path.display());
            }
        }
    }

    fn load_local_state(dir: &Path) -> Option<LocalState> {
        let path = dir.join(LOCAL_STATE_FILE);
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save_local_state(&self) {
        let path = self.app_data_dir.join(LOCAL_STATE_FILE);
        if let Err(e) = fs::create_dir_all(&self.app_data_dir) {
            log::warn!("failed to create {}: {e}", self.app_data_dir.display());
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.local_state) {
            if let Err(e) = fs::write(&path, json) {
                log::warn!("failed to save {}: {e}", path.display());
            }
        }
    }
}

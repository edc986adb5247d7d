mod chain_adapter;
pub mod commands;
mod state;

use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use swap_sdk::{MemoryChain, Network, PredicateTemplate, SwapConfig, SwapNode, SwapSdk};

pub use chain_adapter::{ChainAdapterError, SnapshotChainAdapter};
pub use state::{AppState, AppStateManager, NetworkStatus, SwapRecord};

// ============================================================================
// Desk state
// ============================================================================

/// Everything the command layer needs: persisted app state, the chain
/// snapshot on disk, and the async swap node over it.
pub struct SwapDesk {
    manager: Mutex<AppStateManager>,
    adapter: SnapshotChainAdapter,
    template: PredicateTemplate,
    node: RwLock<SwapNode<MemoryChain>>,
}

impl SwapDesk {
    /// Open the desk in `app_data_dir`, defaulting to the local network on
    /// first launch.
    pub fn open(app_data_dir: PathBuf, template: PredicateTemplate) -> Result<Self, String> {
        let mut manager = AppStateManager::new(app_data_dir.clone());
        manager.initialize();
        if manager.is_first_launch() {
            log::info!("first launch detected - defaulting to local network");
            manager.set_network(Network::Local);
        }
        let network = manager.network().unwrap_or(Network::Local);

        let adapter = SnapshotChainAdapter::new(&app_data_dir);
        let node = Self::build_node(&adapter, &template, network)?;
        Ok(Self {
            manager: Mutex::new(manager),
            adapter,
            template,
            node: RwLock::new(node),
        })
    }

    fn build_node(
        adapter: &SnapshotChainAdapter,
        template: &PredicateTemplate,
        network: Network,
    ) -> Result<SwapNode<MemoryChain>, String> {
        let config = SwapConfig::for_network(network);
        let chain = adapter
            .load(config.cost_model)
            .map_err(|e| format!("failed to load chain: {e}"))?;
        Ok(SwapNode::new(SwapSdk::new(chain, template.clone(), config)))
    }

    /// A handle to the current node. Cheap to clone; never hold the lock
    /// across an await.
    pub fn node(&self) -> Result<SwapNode<MemoryChain>, String> {
        self.node
            .read()
            .map(|n| n.clone())
            .map_err(|_| "node lock failed".to_string())
    }

    pub fn manager(&self) -> &Mutex<AppStateManager> {
        &self.manager
    }

    pub fn adapter(&self) -> &SnapshotChainAdapter {
        &self.adapter
    }

    /// Switch networks, rebuilding the node over the persisted chain.
    pub fn set_network(&self, network: Network) -> Result<AppState, String> {
        self.persist_chain()?;
        let node = Self::build_node(&self.adapter, &self.template, network)?;
        *self.node.write().map_err(|_| "node lock failed".to_string())? = node;
        let mut mgr = self
            .manager
            .lock()
            .map_err(|_| "state lock failed".to_string())?;
        Ok(mgr.set_network(network))
    }

    pub fn persist_chain(&self) -> Result<(), String> {
        let node = self.node()?;
        self.adapter
            .save(node.sdk().chain())
            .map_err(|e| format!("failed to save chain: {e}"))
    }

    pub fn network(&self) -> Result<Network, String> {
        Ok(self.node()?.sdk().config().network)
    }
}

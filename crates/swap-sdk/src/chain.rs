use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::fee::{CostModel, LinearCostModel};
use crate::types::{Address, AssetId, IdempotencyKey, ResourceId, SpendableResource, TxId};

/// Abstraction over the node/provider the SDK queries and submits to.
pub trait ChainBackend {
    /// Unspent resources of `asset_id` owned by `owner`, in provider order.
    fn list_spendable_resources(
        &self,
        owner: &Address,
        asset_id: &AssetId,
    ) -> Result<Vec<SpendableResource>>;

    /// Look up a single resource; `None` if it is unknown or spent.
    fn resource(&self, resource_id: &ResourceId) -> Result<Option<SpendableResource>>;

    /// Execute the draft without committing it.
    fn dry_run(&self, draft: &TransactionDraft) -> Result<DryRunReceipt>;

    /// Submit the draft. Resubmitting under the same key must not apply it twice.
    fn submit(
        &self,
        draft: &TransactionDraft,
        key: &IdempotencyKey,
    ) -> std::result::Result<TxId, SubmitError>;
}

/// Outcome of a node-side dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunReceipt {
    /// Fee the node would charge.
    pub cost: u64,
    /// Why the node would reject the draft, if it would.
    pub failure: Option<String>,
}

/// Failure reported by [`ChainBackend::submit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Transport or provider hiccup; the same submission may be retried.
    #[error("transient submission failure: {0}")]
    Transient(String),

    /// An input was spent by another transaction.
    #[error("input {0} is no longer spendable")]
    StaleResource(ResourceId),

    /// The node refused the transaction.
    #[error("rejected by node: {0}")]
    Rejected(String),
}

/// Serializable view of a [`MemoryChain`]'s unspent set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub resources: Vec<SpendableResource>,
}

#[derive(Debug, Default)]
struct LedgerState {
    resources: Vec<SpendableResource>,
    accepted: HashMap<IdempotencyKey, TxId>,
    nonce: u64,
    fail_next: u32,
    submissions: u32,
}

/// In-process chain: an ordered unspent set with exactly-once consumption.
///
/// Accepted transactions consume their inputs and turn their non-zero
/// outputs into new resources. Submissions are deduplicated by idempotency
/// key.
#[derive(Debug, Default)]
pub struct MemoryChain {
    state: Mutex<LedgerState>,
    cost_model: LinearCostModel,
}

impl MemoryChain {
    pub fn with_cost_model(cost_model: LinearCostModel) -> Self {
        Self {
            state: Mutex::default(),
            cost_model,
        }
    }

    pub fn from_snapshot(snapshot: ChainSnapshot, cost_model: LinearCostModel) -> Self {
        let chain = Self::with_cost_model(cost_model);
        if let Ok(mut state) = chain.state.lock() {
            state.resources = snapshot.resources;
        }
        chain
    }

    pub fn snapshot(&self) -> Result<ChainSnapshot> {
        Ok(ChainSnapshot {
            resources: self.lock()?.resources.clone(),
        })
    }

    pub fn cost_model(&self) -> &LinearCostModel {
        &self.cost_model
    }

    /// Mint a fresh resource for `owner`. Returns it.
    pub fn credit(&self, owner: Address, asset_id: AssetId, amount: u64) -> SpendableResource {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let resource_id = loop {
            state.nonce += 1;
            let mut hasher = Sha256::new();
            hasher.update(b"memory-chain/credit");
            hasher.update(state.nonce.to_be_bytes());
            let id = ResourceId::new(hasher.finalize().into());
            // Restored snapshots may already hold ids minted under low nonces.
            if !state.resources.iter().any(|r| r.resource_id == id) {
                break id;
            }
        };
        let resource = SpendableResource {
            resource_id,
            owner,
            asset_id,
            amount,
        };
        state.resources.push(resource);
        resource
    }

    /// Spend a resource outside of any draft, as a competing transaction would.
    pub fn consume(&self, resource_id: &ResourceId) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.resources.len();
        state.resources.retain(|r| &r.resource_id != resource_id);
        Ok(state.resources.len() != before)
    }

    pub fn balance(&self, owner: &Address, asset_id: &AssetId) -> Result<u64> {
        Ok(self
            .lock()?
            .resources
            .iter()
            .filter(|r| &r.owner == owner && &r.asset_id == asset_id)
            .fold(0u64, |acc, r| acc.saturating_add(r.amount)))
    }

    /// Make the next `count` submissions fail with [`SubmitError::Transient`].
    pub fn fail_next_submissions(&self, count: u32) -> Result<()> {
        self.lock()?.fail_next = count;
        Ok(())
    }

    /// Number of submit calls seen, including failed and deduplicated ones.
    pub fn submission_attempts(&self) -> Result<u32> {
        Ok(self.lock()?.submissions)
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| Error::Chain("memory chain state poisoned".into()))
    }

    fn check_inputs(
        state: &LedgerState,
        draft: &TransactionDraft,
    ) -> std::result::Result<(), SubmitError> {
        if draft.inputs.is_empty() {
            return Err(SubmitError::Rejected("transaction has no inputs".into()));
        }
        for (i, input) in draft.inputs.iter().enumerate() {
            if draft.inputs[..i]
                .iter()
                .any(|r| r.resource_id == input.resource_id)
            {
                return Err(SubmitError::Rejected(format!(
                    "input {} used twice",
                    input.resource_id
                )));
            }
            if !state.resources.contains(input) {
                return Err(SubmitError::StaleResource(input.resource_id));
            }
        }
        Ok(())
    }
}

fn output_resource_id(tx_id: &TxId, index: usize) -> ResourceId {
    let mut hasher = Sha256::new();
    hasher.update(tx_id.as_bytes());
    hasher.update((index as u32).to_be_bytes());
    ResourceId::new(hasher.finalize().into())
}

impl ChainBackend for MemoryChain {
    fn list_spendable_resources(
        &self,
        owner: &Address,
        asset_id: &AssetId,
    ) -> Result<Vec<SpendableResource>> {
        Ok(self
            .lock()?
            .resources
            .iter()
            .filter(|r| &r.owner == owner && &r.asset_id == asset_id)
            .copied()
            .collect())
    }

    fn resource(&self, resource_id: &ResourceId) -> Result<Option<SpendableResource>> {
        Ok(self
            .lock()?
            .resources
            .iter()
            .find(|r| &r.resource_id == resource_id)
            .copied())
    }

    fn dry_run(&self, draft: &TransactionDraft) -> Result<DryRunReceipt> {
        let state = self.lock()?;
        let cost = self.cost_model.cost(draft);
        let failure = match Self::check_inputs(&state, draft) {
            Err(e) => Some(e.to_string()),
            Ok(()) => match draft.check_balance() {
                Err(v) => Some(format!(
                    "asset {} unbalanced: inputs {}, required {}",
                    v.asset_id, v.inputs, v.required
                )),
                Ok(()) if draft.fee_bound < cost => Some(format!(
                    "fee bound {} below cost {cost}",
                    draft.fee_bound
                )),
                Ok(()) => None,
            },
        };
        Ok(DryRunReceipt { cost, failure })
    }

    fn submit(
        &self,
        draft: &TransactionDraft,
        key: &IdempotencyKey,
    ) -> std::result::Result<TxId, SubmitError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SubmitError::Transient("memory chain state poisoned".into()))?;
        state.submissions += 1;

        if let Some(tx_id) = state.accepted.get(key) {
            return Ok(*tx_id);
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(SubmitError::Transient("provider unavailable".into()));
        }

        Self::check_inputs(&state, draft)?;
        draft.check_balance().map_err(|v| {
            SubmitError::Rejected(format!(
                "asset {} unbalanced: inputs {}, required {}",
                v.asset_id, v.inputs, v.required
            ))
        })?;
        let cost = self.cost_model.cost(draft);
        if draft.fee_bound < cost {
            return Err(SubmitError::Rejected(format!(
                "fee bound {} below cost {cost}",
                draft.fee_bound
            )));
        }

        let tx_id = draft.id();
        state.resources.retain(|r| !draft.contains_input(&r.resource_id));
        for (index, output) in draft.outputs.iter().enumerate() {
            if output.amount == 0 {
                continue;
            }
            state.resources.push(SpendableResource {
                resource_id: output_resource_id(&tx_id, index),
                owner: output.to,
                asset_id: output.asset_id,
                amount: output.amount,
            });
        }
        state.accepted.insert(*key, tx_id);
        log::info!(
            "accepted {tx_id}: {} inputs, {} outputs, fee bound {}",
            draft.inputs.len(),
            draft.outputs.len(),
            draft.fee_bound
        );
        Ok(tx_id)
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::{Address, AssetId, Output, OutputKind, ResourceId, SpendableResource, TxId};

/// An unsubmitted candidate transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub inputs: Vec<SpendableResource>,
    pub outputs: Vec<Output>,
    /// Upper bound on the network fee, set by the fee estimator.
    pub fee_bound: u64,
    /// Asset the network fee is paid in. `None` until a fee is set.
    pub fee_asset: Option<AssetId>,
    /// Input owners that are predicates (spent by rule, not by signature).
    pub predicate_owners: Vec<Address>,
}

/// An asset whose inputs do not cover its outputs plus fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceViolation {
    pub asset_id: AssetId,
    pub inputs: u64,
    pub required: u64,
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_input(&mut self, resource: SpendableResource) {
        self.inputs.push(resource);
    }

    pub(crate) fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    pub(crate) fn add_predicate_owner(&mut self, owner: Address) {
        if !self.predicate_owners.contains(&owner) {
            self.predicate_owners.push(owner);
        }
    }

    pub fn contains_input(&self, id: &ResourceId) -> bool {
        self.inputs.iter().any(|r| &r.resource_id == id)
    }

    pub fn input_ids(&self) -> Vec<ResourceId> {
        self.inputs.iter().map(|r| r.resource_id).collect()
    }

    pub fn is_predicate_input(&self, resource: &SpendableResource) -> bool {
        self.predicate_owners.contains(&resource.owner)
    }

    pub fn predicate_input_count(&self) -> usize {
        self.inputs
            .iter()
            .filter(|r| self.is_predicate_input(r))
            .count()
    }

    /// Every asset that appears in an input or output, in byte order.
    pub fn assets(&self) -> BTreeSet<AssetId> {
        self.inputs
            .iter()
            .map(|r| r.asset_id)
            .chain(self.outputs.iter().map(|o| o.asset_id))
            .collect()
    }

    pub fn input_total(&self, asset_id: &AssetId) -> Result<u64> {
        checked_sum(
            self.inputs
                .iter()
                .filter(|r| &r.asset_id == asset_id)
                .map(|r| r.amount),
        )
    }

    pub fn output_total(&self, asset_id: &AssetId) -> Result<u64> {
        checked_sum(
            self.outputs
                .iter()
                .filter(|o| &o.asset_id == asset_id)
                .map(|o| o.amount),
        )
    }

    /// Sum of non-change outputs of an asset.
    pub fn coin_output_total(&self, asset_id: &AssetId) -> Result<u64> {
        checked_sum(
            self.outputs
                .iter()
                .filter(|o| &o.asset_id == asset_id && o.kind == OutputKind::Coin)
                .map(|o| o.amount),
        )
    }

    /// Fee charged against an asset: the bound for the fee asset, zero otherwise.
    pub fn fee_for(&self, asset_id: &AssetId) -> u64 {
        match self.fee_asset {
            Some(fee_asset) if &fee_asset == asset_id => self.fee_bound,
            _ => 0,
        }
    }

    /// Input amount of an asset not yet claimed by coin outputs or the fee.
    ///
    /// Negative when the asset is underfunded.
    pub fn spare(&self, asset_id: &AssetId) -> Result<i128> {
        let inputs = i128::from(self.input_total(asset_id)?);
        let claimed = i128::from(self.coin_output_total(asset_id)?) + i128::from(self.fee_for(asset_id));
        Ok(inputs - claimed)
    }

    /// Check `inputs(A) >= outputs(A) + fee(A)` for every asset `A`.
    ///
    /// An asset whose input or required total overflows `u64` is a violation.
    pub fn check_balance(&self) -> std::result::Result<(), BalanceViolation> {
        for asset_id in self.assets() {
            let inputs = self.input_total(&asset_id).ok();
            let required = self
                .output_total(&asset_id)
                .ok()
                .and_then(|o| o.checked_add(self.fee_for(&asset_id)));
            match (inputs, required) {
                (Some(inputs), Some(required)) if inputs >= required => {}
                (inputs, required) => {
                    return Err(BalanceViolation {
                        asset_id,
                        inputs: inputs.unwrap_or(u64::MAX),
                        required: required.unwrap_or(u64::MAX),
                    });
                }
            }
        }
        if let Some(fee_asset) = self.fee_asset
            && self.fee_bound > 0
            && self.input_total(&fee_asset).unwrap_or(0) < self.fee_bound
        {
            return Err(BalanceViolation {
                asset_id: fee_asset,
                inputs: self.input_total(&fee_asset).unwrap_or(0),
                required: self.fee_bound,
            });
        }
        Ok(())
    }

    /// Replace all change outputs so that every surplus goes to `change_to`.
    ///
    /// Change outputs are appended after the coin outputs in asset byte order.
    /// Fails if any asset is underfunded.
    pub fn rebalance_change(&mut self, change_to: Address) -> Result<()> {
        self.outputs.retain(|o| !o.is_change());
        let mut assets = self.assets();
        if let Some(fee_asset) = self.fee_asset {
            assets.insert(fee_asset);
        }
        for asset_id in assets {
            let spare = self.spare(&asset_id)?;
            if spare < 0 {
                return Err(Error::Draft(format!(
                    "asset {asset_id} is short by {}",
                    -spare
                )));
            }
            if spare > 0 {
                let amount = u64::try_from(spare).map_err(|_| Error::AmountOverflow)?;
                self.outputs.push(Output::change(change_to, amount, asset_id));
            }
        }
        Ok(())
    }

    /// Canonical byte encoding, stable across runs.
    ///
    /// ```text
    /// u32 n_inputs  || n_inputs  * (resource_id || owner || asset_id || amount)
    /// u32 n_outputs || n_outputs * (kind || to || amount || asset_id)
    /// fee_bound || fee_asset_flag [|| fee_asset]
    /// u32 n_predicates || n_predicates * owner
    /// ```
    ///
    /// Integers are big-endian; `kind` is 0x00 for coin, 0x01 for change.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            16 + self.inputs.len() * 104 + self.outputs.len() * 73 + self.predicate_owners.len() * 32,
        );
        buf.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for r in &self.inputs {
            buf.extend_from_slice(r.resource_id.as_bytes());
            buf.extend_from_slice(r.owner.as_bytes());
            buf.extend_from_slice(r.asset_id.as_bytes());
            buf.extend_from_slice(&r.amount.to_be_bytes());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for o in &self.outputs {
            buf.push(match o.kind {
                OutputKind::Coin => 0x00,
                OutputKind::Change => 0x01,
            });
            buf.extend_from_slice(o.to.as_bytes());
            buf.extend_from_slice(&o.amount.to_be_bytes());
            buf.extend_from_slice(o.asset_id.as_bytes());
        }
        buf.extend_from_slice(&self.fee_bound.to_be_bytes());
        match self.fee_asset {
            Some(asset) => {
                buf.push(0x01);
                buf.extend_from_slice(asset.as_bytes());
            }
            None => buf.push(0x00),
        }
        buf.extend_from_slice(&(self.predicate_owners.len() as u32).to_be_bytes());
        for owner in &self.predicate_owners {
            buf.extend_from_slice(owner.as_bytes());
        }
        buf
    }

    /// Transaction ID: `SHA256("predicate-swap/tx" || encode())`.
    pub fn id(&self) -> TxId {
        let mut hasher = Sha256::new();
        hasher.update(b"predicate-swap/tx");
        hasher.update(self.encode());
        TxId::new(hasher.finalize().into())
    }
}

fn checked_sum(mut amounts: impl Iterator<Item = u64>) -> Result<u64> {
    amounts.try_fold(0u64, |acc, a| acc.checked_add(a).ok_or(Error::AmountOverflow))
}

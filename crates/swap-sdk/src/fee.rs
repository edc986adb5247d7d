//! Network fee estimation and fee-input funding.
//!
//! The fee bound is computed from a deterministic, integer-only cost model
//! (u128 internally), then padded by a safety margin in basis points. Funding
//! adds fee-asset inputs from the fee payer until the draft balances.

use serde::{Deserialize, Serialize};

use crate::chain::ChainBackend;
use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::selection::select_from_chain;
use crate::types::{Address, AssetId};

/// Basis-point denominator (10_000 = 1.0x).
pub const BPS: u64 = 10_000;

/// Default safety margin on top of the modelled cost (20%).
pub const DEFAULT_MARGIN_BPS: u64 = 2_000;

/// Upper bound on select-and-re-estimate rounds while funding a fee.
const MAX_FUNDING_ROUNDS: usize = 8;

/// Computes the network cost of executing a draft.
pub trait CostModel {
    fn cost(&self, draft: &TransactionDraft) -> u64;
}

/// Gas charged per structural element of a draft, times a gas price.
///
/// Predicate inputs are charged extra for rule execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCostModel {
    pub base_gas: u64,
    pub gas_per_input: u64,
    pub gas_per_predicate_input: u64,
    pub gas_per_output: u64,
    pub gas_per_byte: u64,
    pub gas_price: u64,
}

impl Default for LinearCostModel {
    fn default() -> Self {
        Self {
            base_gas: 1_000,
            gas_per_input: 200,
            gas_per_predicate_input: 2_500,
            gas_per_output: 100,
            gas_per_byte: 1,
            gas_price: 1,
        }
    }
}

impl CostModel for LinearCostModel {
    fn cost(&self, draft: &TransactionDraft) -> u64 {
        let predicate_inputs = draft.predicate_input_count() as u128;
        let gas = u128::from(self.base_gas)
            + draft.inputs.len() as u128 * u128::from(self.gas_per_input)
            + predicate_inputs * u128::from(self.gas_per_predicate_input)
            + draft.outputs.len() as u128 * u128::from(self.gas_per_output)
            + draft.encode().len() as u128 * u128::from(self.gas_per_byte);
        let fee = gas * u128::from(self.gas_price);
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}

/// Sets a draft's fee bound and funds it from a fee payer.
#[derive(Debug, Clone)]
pub struct FeeEstimator<M = LinearCostModel> {
    model: M,
    fee_asset: AssetId,
    margin_bps: u64,
}

impl<M: CostModel> FeeEstimator<M> {
    pub fn new(model: M, fee_asset: AssetId) -> Self {
        Self {
            model,
            fee_asset,
            margin_bps: DEFAULT_MARGIN_BPS,
        }
    }

    pub fn with_margin_bps(mut self, margin_bps: u64) -> Self {
        self.margin_bps = margin_bps;
        self
    }

    pub fn fee_asset(&self) -> AssetId {
        self.fee_asset
    }

    /// Modelled cost padded by the margin, rounded up.
    pub fn estimate(&self, draft: &TransactionDraft) -> u64 {
        self.pad(self.model.cost(draft))
    }

    fn pad(&self, cost: u64) -> u64 {
        let scaled = u128::from(cost) * u128::from(BPS + self.margin_bps);
        let padded = scaled.div_ceil(u128::from(BPS));
        u64::try_from(padded).unwrap_or(u64::MAX)
    }

    /// Set the fee bound and add fee-asset inputs from `fee_payer` until the
    /// draft balances. Change is re-derived for `fee_payer`.
    ///
    /// Returns the fee bound. Fails with [`Error::FeeFundingFailed`] if the
    /// payer cannot cover the shortfall.
    pub fn fund<B: ChainBackend + ?Sized>(
        &self,
        draft: &mut TransactionDraft,
        fee_payer: &Address,
        chain: &B,
    ) -> Result<u64> {
        self.fund_with_floor(draft, fee_payer, chain, 0)
    }

    /// Like [`fund`](Self::fund), then dry-run the draft on `chain`. If the
    /// node reports a cost above the bound, re-fund once against the node's
    /// cost (padded) and check again.
    pub fn fund_with_feedback<B: ChainBackend + ?Sized>(
        &self,
        draft: &mut TransactionDraft,
        fee_payer: &Address,
        chain: &B,
    ) -> Result<u64> {
        let bound = self.fund(draft, fee_payer, chain)?;
        let receipt = chain.dry_run(draft)?;
        if receipt.cost <= bound {
            return Ok(bound);
        }

        log::warn!(
            "fee bound {bound} below node cost {}, widening and re-funding",
            receipt.cost
        );
        let bound = self.fund_with_floor(draft, fee_payer, chain, self.pad(receipt.cost))?;
        let receipt = chain.dry_run(draft)?;
        if receipt.cost > bound {
            return Err(Error::FeeUnderestimated {
                bound,
                actual: receipt.cost,
            });
        }
        Ok(bound)
    }

    fn fund_with_floor<B: ChainBackend + ?Sized>(
        &self,
        draft: &mut TransactionDraft,
        fee_payer: &Address,
        chain: &B,
        floor: u64,
    ) -> Result<u64> {
        draft.fee_asset = Some(self.fee_asset);
        let mut shortfall = 0u64;

        for round in 0..MAX_FUNDING_ROUNDS {
            let bound = self.estimate(draft).max(floor);
            draft.fee_bound = bound;

            let spare = draft.spare(&self.fee_asset)?;
            if spare >= 0 {
                draft.rebalance_change(*fee_payer)?;
                // Change outputs grow the draft; the bound must still cover it.
                if self.estimate(draft).max(floor) <= bound {
                    log::debug!("fee bound {bound} funded after {round} extra round(s)");
                    return Ok(bound);
                }
                continue;
            }

            shortfall = u64::try_from(-spare).map_err(|_| Error::AmountOverflow)?;
            let exclude = draft.input_ids();
            let extra = select_from_chain(chain, fee_payer, &self.fee_asset, shortfall, &exclude)
                .map_err(|e| match e {
                    Error::InsufficientFunds {
                        required,
                        available,
                        ..
                    } => Error::FeeFundingFailed {
                        required,
                        available,
                    },
                    other => other,
                })?;
            for resource in extra {
                draft.add_input(resource);
            }
        }

        Err(Error::FeeFundingFailed {
            required: shortfall,
            available: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::types::{Output, ResourceId, SpendableResource};

    const PAYER: Address = Address::new([0x50; 32]);
    const GAS: AssetId = AssetId::new([0x00; 32]);
    const X: AssetId = AssetId::new([0x0a; 32]);

    fn transfer_draft() -> TransactionDraft {
        let mut d = TransactionDraft::new();
        d.add_input(SpendableResource {
            resource_id: ResourceId::new([1; 32]),
            owner: PAYER,
            asset_id: X,
            amount: 100,
        });
        d.add_output(Output::coin(Address::new([0x11; 32]), 100, X));
        d
    }

    #[test]
    fn cost_grows_with_predicate_inputs() {
        let model = LinearCostModel::default();
        let plain = transfer_draft();
        let mut with_predicate = plain.clone();
        with_predicate.add_predicate_owner(PAYER);
        assert_eq!(
            model.cost(&with_predicate) - model.cost(&plain),
            model.gas_per_predicate_input + 32 * model.gas_per_byte
        );
    }

    #[test]
    fn estimate_applies_margin_rounding_up() {
        let est = FeeEstimator::new(LinearCostModel::default(), GAS).with_margin_bps(2_500);
        assert_eq!(est.pad(1_000), 1_250);
        assert_eq!(est.pad(1), 2);
        assert_eq!(est.pad(0), 0);
    }

    #[test]
    fn fund_adds_fee_inputs_and_change() {
        let chain = MemoryChain::default();
        chain.credit(PAYER, GAS, 1_000_000);
        let est = FeeEstimator::new(LinearCostModel::default(), GAS);
        let mut d = transfer_draft();
        let bound = est.fund(&mut d, &PAYER, &chain).unwrap();

        assert_eq!(d.fee_bound, bound);
        assert_eq!(d.fee_asset, Some(GAS));
        assert!(bound >= LinearCostModel::default().cost(&d));
        assert!(d.check_balance().is_ok());
        let change = d
            .outputs
            .iter()
            .find(|o| o.is_change() && o.asset_id == GAS)
            .unwrap();
        assert_eq!(change.amount, 1_000_000 - bound);
    }

    #[test]
    fn fund_fails_when_payer_lacks_fee_asset() {
        let chain = MemoryChain::default();
        chain.credit(PAYER, GAS, 3);
        let est = FeeEstimator::new(LinearCostModel::default(), GAS);
        let mut d = transfer_draft();
        match est.fund(&mut d, &PAYER, &chain).unwrap_err() {
            Error::FeeFundingFailed { available, .. } => assert_eq!(available, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn feedback_widens_bound_to_node_cost() {
        let chain = MemoryChain::with_cost_model(LinearCostModel {
            gas_price: 5,
            ..LinearCostModel::default()
        });
        chain.credit(PAYER, GAS, 10_000_000);
        let est = FeeEstimator::new(LinearCostModel::default(), GAS);
        let mut d = transfer_draft();
        let bound = est.fund_with_feedback(&mut d, &PAYER, &chain).unwrap();
        let node_cost = chain.dry_run(&d).unwrap().cost;
        assert!(bound >= node_cost);
        assert!(d.check_balance().is_ok());
    }
}

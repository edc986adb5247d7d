use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chain::ChainBackend;
use crate::draft::TransactionDraft;
use crate::error::{Error, Stage, StageExt, SwapError};
use crate::fee::{DEFAULT_MARGIN_BPS, FeeEstimator, LinearCostModel};
use crate::network::Network;
use crate::selection::select_from_chain;
use crate::simulate::{SimulationReport, simulate};
use crate::submit::{RetryPolicy, submit_with_retry};
use crate::swap_predicate::contract::EscrowAccount;
use crate::swap_predicate::funding::{EscrowFunding, escrow_funding};
use crate::swap_predicate::params::ConfigurableConstants;
use crate::swap_predicate::template::PredicateTemplate;
use crate::swap_predicate::tx::deposit::{DepositDraftParams, build_deposit_draft};
use crate::swap_predicate::tx::reclaim::{ReclaimDraftParams, build_reclaim_draft};
use crate::swap_predicate::tx::swap::{SwapDraftParams, build_swap_draft};
use crate::types::{Address, ResourceId, SpendableResource, TxId};

type StagedResult<T> = std::result::Result<T, SwapError>;

/// Runtime settings of a [`SwapSdk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapConfig {
    pub network: Network,
    /// Cost model used for local fee estimates.
    pub cost_model: LinearCostModel,
    /// Safety margin over the modelled cost, in basis points.
    pub fee_margin_bps: u64,
    pub retry: RetryPolicy,
}

impl SwapConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            cost_model: LinearCostModel::default(),
            fee_margin_bps: DEFAULT_MARGIN_BPS,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self::for_network(Network::Local)
    }
}

/// What a prepared draft does to its escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftPurpose {
    Deposit,
    Swap,
    Reclaim,
}

/// A funded, simulated draft ready to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedDraft {
    pub purpose: DraftPurpose,
    pub account: EscrowAccount,
    /// The party paying the network fee and receiving change.
    pub party: Address,
    pub draft: TransactionDraft,
    pub report: SimulationReport,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub tx_id: TxId,
    pub purpose: DraftPurpose,
    pub attempts: u32,
}

/// Escrow swap pipeline over a chain backend.
///
/// Every step returns a [`SwapError`] naming the stage that failed.
pub struct SwapSdk<B> {
    chain: B,
    template: PredicateTemplate,
    config: SwapConfig,
    estimator: FeeEstimator,
}

impl<B: ChainBackend> SwapSdk<B> {
    pub fn new(chain: B, template: PredicateTemplate, config: SwapConfig) -> Self {
        let estimator = FeeEstimator::new(config.cost_model, config.network.base_asset())
            .with_margin_bps(config.fee_margin_bps);
        Self {
            chain,
            template,
            config,
            estimator,
        }
    }

    pub fn chain(&self) -> &B {
        &self.chain
    }

    pub fn template(&self) -> &PredicateTemplate {
        &self.template
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    // ── Binding and derivation ──────────────────────────────────────────

    /// Bind raw named form inputs into typed constants.
    pub fn bind_constants(
        &self,
        form: &HashMap<String, String>,
    ) -> StagedResult<ConfigurableConstants> {
        ConfigurableConstants::bind(form).at(Stage::Bind)
    }

    pub fn escrow_account(&self, constants: ConfigurableConstants) -> EscrowAccount {
        let account = EscrowAccount::derive(&self.template, constants);
        log::debug!("derived escrow {}", account.address());
        account
    }

    pub fn escrow_funding(&self, account: &EscrowAccount) -> StagedResult<EscrowFunding> {
        escrow_funding(&self.chain, account).at(Stage::SelectEscrow)
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// The escrow's resources, which must hold exactly one locked unit.
    pub fn select_escrow(&self, account: &EscrowAccount) -> StagedResult<Vec<SpendableResource>> {
        match self.escrow_funding(account)? {
            EscrowFunding::Funded { resources } => Ok(resources),
            EscrowFunding::Unfunded => Err(SwapError::new(
                Stage::SelectEscrow,
                Error::UnexpectedEscrowBalance { found: 0 },
            )),
            EscrowFunding::Overfunded { amount, .. } => Err(SwapError::new(
                Stage::SelectEscrow,
                Error::UnexpectedEscrowBalance { found: amount },
            )),
        }
    }

    /// The payer's resources covering every payer requirement of the swap.
    pub fn select_payer(
        &self,
        account: &EscrowAccount,
        payer: &Address,
    ) -> StagedResult<Vec<SpendableResource>> {
        let requirements = account
            .constants()
            .payer_requirements()
            .at(Stage::SelectPayer)?;
        let mut selected: Vec<SpendableResource> = Vec::new();
        for (asset_id, amount) in requirements {
            let exclude: Vec<ResourceId> = selected.iter().map(|r| r.resource_id).collect();
            let picked = select_from_chain(&self.chain, payer, &asset_id, amount, &exclude)
                .at(Stage::SelectPayer)?;
            selected.extend(picked);
        }
        Ok(selected)
    }

    // ── Prepare ─────────────────────────────────────────────────────────

    /// Build, fund and simulate the draft that swaps the escrowed unit to
    /// `payer` for the ask.
    ///
    /// A fee split that would make the receiver amount negative fails before
    /// any chain query.
    pub fn prepare_swap(
        &self,
        constants: ConfigurableConstants,
        payer: Address,
    ) -> StagedResult<PreparedDraft> {
        constants.receiver_amount().at(Stage::Build)?;
        let account = self.escrow_account(constants);
        let escrow_inputs = self.select_escrow(&account)?;
        let payer_inputs = self.select_payer(&account, &payer)?;
        self.assemble_swap(account, payer, escrow_inputs, payer_inputs)
    }

    /// Build, fund and simulate a swap from already-selected resources.
    pub fn assemble_swap(
        &self,
        account: EscrowAccount,
        payer: Address,
        escrow_inputs: Vec<SpendableResource>,
        payer_inputs: Vec<SpendableResource>,
    ) -> StagedResult<PreparedDraft> {
        let draft = build_swap_draft(&SwapDraftParams {
            account,
            escrow_inputs,
            payer,
            payer_inputs,
        })
        .at(Stage::Build)?;
        self.finish(DraftPurpose::Swap, account, payer, draft)
    }

    /// Build, fund and simulate the draft moving one locked unit from
    /// `depositor` into the escrow.
    pub fn prepare_deposit(
        &self,
        constants: ConfigurableConstants,
        depositor: Address,
    ) -> StagedResult<PreparedDraft> {
        let account = self.escrow_account(constants);
        let depositor_inputs = select_from_chain(
            &self.chain,
            &depositor,
            &constants.locked_asset_id,
            1,
            &[],
        )
        .at(Stage::SelectPayer)?;
        let draft = build_deposit_draft(&DepositDraftParams {
            account,
            depositor,
            depositor_inputs,
        })
        .at(Stage::Build)?;
        self.finish(DraftPurpose::Deposit, account, depositor, draft)
    }

    /// Build, fund and simulate the draft returning everything the escrow
    /// holds to the receiver through the owner path.
    pub fn prepare_reclaim(&self, constants: ConfigurableConstants) -> StagedResult<PreparedDraft> {
        let account = self.escrow_account(constants);
        let receiver = constants.receiver;
        let escrow_inputs = self.escrow_funding(&account)?.resources().to_vec();
        if escrow_inputs.is_empty() {
            return Err(SwapError::new(
                Stage::SelectEscrow,
                Error::UnexpectedEscrowBalance { found: 0 },
            ));
        }
        // One network-fee resource of the receiver authorises the owner path.
        let owner_inputs = select_from_chain(
            &self.chain,
            &receiver,
            &self.estimator.fee_asset(),
            1,
            &[],
        )
        .at(Stage::SelectPayer)?;
        let draft = build_reclaim_draft(&ReclaimDraftParams {
            account,
            escrow_inputs,
            owner_inputs,
        })
        .at(Stage::Build)?;
        self.finish(DraftPurpose::Reclaim, account, receiver, draft)
    }

    fn finish(
        &self,
        purpose: DraftPurpose,
        account: EscrowAccount,
        party: Address,
        mut draft: TransactionDraft,
    ) -> StagedResult<PreparedDraft> {
        let fee_bound = self
            .estimator
            .fund_with_feedback(&mut draft, &party, &self.chain)
            .at(Stage::Fee)?;
        let report = self.simulate(&draft, &account)?;
        log::info!(
            "prepared {purpose:?} draft {} for escrow {} (fee bound {fee_bound}, {} inputs, {} outputs)",
            draft.id(),
            account.address(),
            draft.inputs.len(),
            draft.outputs.len()
        );
        Ok(PreparedDraft {
            purpose,
            account,
            party,
            draft,
            report,
        })
    }

    // ── Simulate and submit ─────────────────────────────────────────────

    /// Simulate a draft; a rejection is an error.
    pub fn simulate(
        &self,
        draft: &TransactionDraft,
        account: &EscrowAccount,
    ) -> StagedResult<SimulationReport> {
        simulate(draft, &self.chain, std::slice::from_ref(account))
            .and_then(SimulationReport::into_result)
            .at(Stage::Simulate)
    }

    /// Submit a prepared draft, retrying transient failures.
    ///
    /// The escrow account is re-derived from its constants and the draft is
    /// simulated again first; a prepared draft may have been edited or gone
    /// stale since it was built.
    pub fn submit(&self, prepared: &PreparedDraft) -> StagedResult<SubmitResult> {
        let account = self.escrow_account(*prepared.account.constants());
        if account != prepared.account {
            return Err(SwapError::new(
                Stage::Derive,
                Error::Draft(format!(
                    "escrow {} does not match its constants",
                    prepared.account.address()
                )),
            ));
        }
        self.simulate(&prepared.draft, &account)?;
        let outcome =
            submit_with_retry(&self.chain, &prepared.draft, &self.config.retry).at(Stage::Submit)?;
        log::info!(
            "submitted {:?} as {} after {} attempt(s)",
            prepared.purpose,
            outcome.tx_id,
            outcome.attempts
        );
        Ok(SubmitResult {
            tx_id: outcome.tx_id,
            purpose: prepared.purpose,
            attempts: outcome.attempts,
        })
    }
}

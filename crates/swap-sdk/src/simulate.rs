//! Local validation of a draft before it is submitted.
//!
//! Simulation never mutates chain state. Running it twice on the same draft
//! against the same chain state yields the same verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::ChainBackend;
use crate::draft::{BalanceViolation, TransactionDraft};
use crate::error::{Error, Result};
use crate::swap_predicate::contract::EscrowAccount;
use crate::swap_predicate::rule::{RuleViolation, SpendPath, evaluate_spend_rule};
use crate::types::{Address, ResourceId};

/// Why a draft would not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    EmptyDraft,
    DuplicateInput(ResourceId),
    /// An input is unknown to the chain or already spent.
    StaleResource(ResourceId),
    Unbalanced(BalanceViolation),
    /// A predicate input has no known escrow to evaluate its rule against.
    UnknownPredicate(Address),
    /// An escrow input is spent without being declared a predicate input.
    UnmarkedPredicate(Address),
    SpendRule {
        escrow: Address,
        violation: RuleViolation,
    },
    FeeBelowCost {
        bound: u64,
        cost: u64,
    },
    /// The node's own dry run failed.
    Node(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyDraft => write!(f, "draft has no inputs"),
            RejectReason::DuplicateInput(id) => write!(f, "input {id} appears twice"),
            RejectReason::StaleResource(id) => write!(f, "input {id} is spent or unknown"),
            RejectReason::Unbalanced(v) => write!(
                f,
                "asset {} unbalanced: inputs {}, required {}",
                v.asset_id, v.inputs, v.required
            ),
            RejectReason::UnknownPredicate(owner) => {
                write!(f, "no escrow known for predicate {owner}")
            }
            RejectReason::UnmarkedPredicate(owner) => {
                write!(f, "escrow {owner} spent without its predicate")
            }
            RejectReason::SpendRule { escrow, violation } => {
                write!(f, "spend rule of {escrow} not satisfied: {violation}")
            }
            RejectReason::FeeBelowCost { bound, cost } => {
                write!(f, "fee bound {bound} below cost {cost}")
            }
            RejectReason::Node(reason) => write!(f, "node dry run failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Valid,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub verdict: Verdict,
    /// Cost reported by the node's dry run; zero if checks failed before it.
    pub cost: u64,
    /// One line per check that ran, in order.
    pub diagnostics: Vec<String>,
}

impl SimulationReport {
    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }

    /// `Ok(self)` if valid, [`Error::SimulationRejected`] otherwise.
    pub fn into_result(self) -> Result<Self> {
        match self.verdict {
            Verdict::Valid => Ok(self),
            Verdict::Rejected(reason) => Err(Error::SimulationRejected(reason)),
        }
    }
}

/// Check a draft against the chain and the spend rules of its escrows.
///
/// Checks, in order: non-empty, no duplicate inputs, every input still
/// unspent, per-asset balance, the spend rule of every known escrow that
/// owns an input, declared predicates, the node's dry run, and fee bound
/// against the node's cost. Stops at the first failure.
///
/// `Err` is returned only if the chain cannot be queried.
pub fn simulate<B: ChainBackend + ?Sized>(
    draft: &TransactionDraft,
    chain: &B,
    escrows: &[EscrowAccount],
) -> Result<SimulationReport> {
    let mut diagnostics = Vec::new();
    let reject = |reason: RejectReason, cost: u64, diagnostics: Vec<String>| -> Result<SimulationReport> {
        log::debug!("simulation rejected draft {}: {reason}", draft.id());
        Ok(SimulationReport {
            verdict: Verdict::Rejected(reason),
            cost,
            diagnostics,
        })
    };

    if draft.inputs.is_empty() {
        return reject(RejectReason::EmptyDraft, 0, diagnostics);
    }
    for (i, input) in draft.inputs.iter().enumerate() {
        if draft.inputs[..i]
            .iter()
            .any(|r| r.resource_id == input.resource_id)
        {
            return reject(RejectReason::DuplicateInput(input.resource_id), 0, diagnostics);
        }
    }
    diagnostics.push(format!("{} distinct inputs", draft.inputs.len()));

    for input in &draft.inputs {
        if chain.resource(&input.resource_id)?.as_ref() != Some(input) {
            return reject(RejectReason::StaleResource(input.resource_id), 0, diagnostics);
        }
    }
    diagnostics.push("all inputs unspent".into());

    if let Err(violation) = draft.check_balance() {
        return reject(RejectReason::Unbalanced(violation), 0, diagnostics);
    }
    diagnostics.push(format!("{} assets balanced", draft.assets().len()));

    for escrow in escrows {
        let owner = escrow.address();
        if !draft.inputs.iter().any(|r| r.owner == owner) {
            continue;
        }
        match evaluate_spend_rule(escrow.constants(), &owner, draft) {
            Ok(path) => diagnostics.push(format!(
                "escrow {owner} spendable via {}",
                match path {
                    SpendPath::Swap => "swap path",
                    SpendPath::OwnerReclaim => "owner path",
                }
            )),
            Err(violation) => {
                return reject(
                    RejectReason::SpendRule {
                        escrow: owner,
                        violation,
                    },
                    0,
                    diagnostics,
                );
            }
        }
        if !draft.predicate_owners.contains(&owner) {
            return reject(RejectReason::UnmarkedPredicate(owner), 0, diagnostics);
        }
    }
    for owner in &draft.predicate_owners {
        if draft.inputs.iter().any(|r| &r.owner == owner)
            && !escrows.iter().any(|e| &e.address() == owner)
        {
            return reject(RejectReason::UnknownPredicate(*owner), 0, diagnostics);
        }
    }

    let receipt = chain.dry_run(draft)?;
    if receipt.cost > draft.fee_bound {
        return reject(
            RejectReason::FeeBelowCost {
                bound: draft.fee_bound,
                cost: receipt.cost,
            },
            receipt.cost,
            diagnostics,
        );
    }
    if let Some(failure) = receipt.failure {
        return reject(RejectReason::Node(failure), receipt.cost, diagnostics);
    }
    diagnostics.push(format!(
        "node cost {} within fee bound {}",
        receipt.cost, draft.fee_bound
    ));

    Ok(SimulationReport {
        verdict: Verdict::Valid,
        cost: receipt.cost,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::fee::LinearCostModel;
    use crate::testing::{PAYER, sample_constants, sample_template};
    use crate::types::{AssetId, Output};

    fn free_chain() -> MemoryChain {
        MemoryChain::with_cost_model(LinearCostModel {
            gas_price: 0,
            ..LinearCostModel::default()
        })
    }

    fn escrow_spend(chain: &MemoryChain) -> (EscrowAccount, TransactionDraft) {
        let c = sample_constants();
        let account = EscrowAccount::derive(&sample_template(), c);
        let locked = chain.credit(account.address(), c.locked_asset_id, 1);
        let payment = chain.credit(PAYER, c.ask_asset, c.ask_amount);
        let mut d = TransactionDraft::new();
        d.add_input(locked);
        d.add_input(payment);
        d.add_predicate_owner(account.address());
        d.add_output(Output::coin(c.receiver, c.ask_amount - c.fee_amount, c.ask_asset));
        d.add_output(Output::coin(c.treasury_address, c.fee_amount, c.fee_asset));
        d.add_output(Output::coin(PAYER, 1, c.locked_asset_id));
        (account, d)
    }

    #[test]
    fn valid_swap_passes_and_is_repeatable() {
        let chain = free_chain();
        let (account, d) = escrow_spend(&chain);
        let first = simulate(&d, &chain, &[account]).unwrap();
        let second = simulate(&d, &chain, &[account]).unwrap();
        assert!(first.is_valid(), "{:?}", first.verdict);
        assert_eq!(first, second);
        assert_eq!(chain.snapshot().unwrap().resources.len(), 2);
    }

    #[test]
    fn spent_input_is_stale() {
        let chain = free_chain();
        let (account, d) = escrow_spend(&chain);
        chain.consume(&d.inputs[1].resource_id).unwrap();
        let report = simulate(&d, &chain, &[account]).unwrap();
        assert_eq!(
            report.verdict,
            Verdict::Rejected(RejectReason::StaleResource(d.inputs[1].resource_id))
        );
        assert!(matches!(
            report.into_result().unwrap_err().kind(),
            crate::error::ErrorKind::StaleResource
        ));
    }

    #[test]
    fn rule_violation_names_the_escrow() {
        let chain = free_chain();
        let (account, mut d) = escrow_spend(&chain);
        d.outputs[0].amount -= 1;
        let report = simulate(&d, &chain, &[account]).unwrap();
        match report.verdict {
            Verdict::Rejected(RejectReason::SpendRule { escrow, .. }) => {
                assert_eq!(escrow, account.address())
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn unknown_predicate_is_rejected() {
        let chain = free_chain();
        let (_, d) = escrow_spend(&chain);
        let report = simulate(&d, &chain, &[]).unwrap();
        assert!(matches!(
            report.verdict,
            Verdict::Rejected(RejectReason::UnknownPredicate(_))
        ));
    }

    #[test]
    fn undeclared_escrow_input_still_checks_its_rule() {
        let chain = free_chain();
        let (account, mut d) = escrow_spend(&chain);
        d.predicate_owners.clear();
        d.outputs[0] = Output::coin(PAYER, 990, d.outputs[0].asset_id);
        let report = simulate(&d, &chain, &[account]).unwrap();
        match report.verdict {
            Verdict::Rejected(RejectReason::SpendRule { escrow, .. }) => {
                assert_eq!(escrow, account.address())
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn undeclared_escrow_input_is_rejected() {
        let chain = free_chain();
        let (account, mut d) = escrow_spend(&chain);
        d.predicate_owners.clear();
        let report = simulate(&d, &chain, &[account]).unwrap();
        assert_eq!(
            report.verdict,
            Verdict::Rejected(RejectReason::UnmarkedPredicate(account.address()))
        );
    }

    #[test]
    fn unbalanced_draft_is_rejected() {
        let chain = free_chain();
        let (account, mut d) = escrow_spend(&chain);
        d.outputs.push(Output::coin(PAYER, 5, AssetId::new([0x99; 32])));
        let report = simulate(&d, &chain, &[account]).unwrap();
        assert!(matches!(
            report.verdict,
            Verdict::Rejected(RejectReason::Unbalanced(_))
        ));
    }

    #[test]
    fn fee_below_node_cost_is_rejected() {
        let chain = MemoryChain::default();
        let (account, d) = escrow_spend(&chain);
        let report = simulate(&d, &chain, &[account]).unwrap();
        assert!(matches!(
            report.verdict,
            Verdict::Rejected(RejectReason::FeeBelowCost { bound: 0, .. })
        ));
        assert!(report.cost > 0);
    }
}

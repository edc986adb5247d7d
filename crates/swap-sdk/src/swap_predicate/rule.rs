use std::fmt;

use serde::{Deserialize, Serialize};

use crate::draft::TransactionDraft;
use crate::types::{Address, Output};

use super::params::ConfigurableConstants;

/// Output index the swap path expects the receiver payment at.
pub const RECEIVER_OUTPUT_INDEX: usize = 0;
/// Output index the swap path expects the treasury cut at.
pub const TREASURY_OUTPUT_INDEX: usize = 1;
/// Output index of the locked unit going to the payer.
pub const PAYER_OUTPUT_INDEX: usize = 2;

/// Which branch of the spend rule authorised the escrow inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendPath {
    /// Receiver and treasury are paid at the expected positions.
    Swap,
    /// The receiver co-signs with one of its own inputs.
    OwnerReclaim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleViolation {
    /// Constants make the receiver amount negative.
    FeeExceedsAsk { fee_amount: u64, ask_amount: u64 },
    MissingOutput { index: usize },
    OutputMismatch {
        index: usize,
        expected: Output,
        found: Output,
    },
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleViolation::FeeExceedsAsk {
                fee_amount,
                ask_amount,
            } => write!(f, "fee {fee_amount} exceeds ask {ask_amount}"),
            RuleViolation::MissingOutput { index } => write!(f, "missing output {index}"),
            RuleViolation::OutputMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "output {index}: expected {} of {} to {}, found {} of {} to {}",
                expected.amount,
                expected.asset_id,
                expected.to,
                found.amount,
                found.asset_id,
                found.to
            ),
        }
    }
}

/// The two outputs the swap path pins by position: receiver, then treasury.
pub fn expected_swap_outputs(
    constants: &ConfigurableConstants,
) -> Result<[Output; 2], RuleViolation> {
    let receiver_amount = constants
        .ask_amount
        .checked_sub(constants.fee_amount)
        .ok_or(RuleViolation::FeeExceedsAsk {
            fee_amount: constants.fee_amount,
            ask_amount: constants.ask_amount,
        })?;
    Ok([
        Output::coin(constants.receiver, receiver_amount, constants.ask_asset),
        Output::coin(
            constants.treasury_address,
            constants.fee_amount,
            constants.fee_asset,
        ),
    ])
}

/// Evaluate the swap predicate's declared spend rule for a draft.
///
/// The escrow at `escrow` may be spent if either
/// - some input not owned by the escrow belongs to the receiver, or
/// - output 0 pays `ask_amount - fee_amount` of the ask asset to the receiver
///   and output 1 pays `fee_amount` of the fee asset to the treasury.
pub fn evaluate_spend_rule(
    constants: &ConfigurableConstants,
    escrow: &Address,
    draft: &TransactionDraft,
) -> Result<SpendPath, RuleViolation> {
    let owner_signed = draft
        .inputs
        .iter()
        .any(|r| &r.owner != escrow && r.owner == constants.receiver);
    if owner_signed {
        return Ok(SpendPath::OwnerReclaim);
    }

    let expected = expected_swap_outputs(constants)?;
    for (index, want) in [RECEIVER_OUTPUT_INDEX, TREASURY_OUTPUT_INDEX]
        .into_iter()
        .zip(expected)
    {
        let found = draft
            .outputs
            .get(index)
            .ok_or(RuleViolation::MissingOutput { index })?;
        if found.to != want.to || found.amount != want.amount || found.asset_id != want.asset_id
        {
            return Err(RuleViolation::OutputMismatch {
                index,
                expected: want,
                found: *found,
            });
        }
    }
    Ok(SpendPath::Swap)
}

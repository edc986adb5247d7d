use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::swap_predicate::contract::EscrowAccount;
use crate::types::{Address, Output, SpendableResource};

use super::{check_owned, sum_of};

/// Parameters for constructing the swap draft.
pub struct SwapDraftParams {
    /// The escrow being spent.
    pub account: EscrowAccount,
    /// Resources held by the escrow; must total exactly one locked unit.
    pub escrow_inputs: Vec<SpendableResource>,
    /// Who pays the ask and receives the locked unit.
    pub payer: Address,
    /// The payer's resources covering the ask (and fee, if in another asset).
    pub payer_inputs: Vec<SpendableResource>,
}

/// Build the unfunded swap draft.
///
/// ```text
/// Inputs:  [0..E-1]  escrow resources (predicate, exactly 1 locked unit)
///          [E..]     payer resources
///
/// Outputs: [0]       receiver: ask - fee of ask asset
///          [1]       treasury: fee of fee asset
///          [2]       payer: 1 locked unit
///          [3..]     change to payer, one per asset with surplus
/// ```
///
/// No network fee is set; the fee estimator funds it afterwards.
pub fn build_swap_draft(params: &SwapDraftParams) -> Result<TransactionDraft> {
    let constants = params.account.constants();
    let escrow = params.account.address();
    let receiver_amount = constants.receiver_amount()?;

    if params.payer == escrow {
        return Err(Error::Draft("payer cannot be the escrow itself".into()));
    }
    check_owned(&params.escrow_inputs, &escrow, "escrow")?;
    check_owned(&params.payer_inputs, &params.payer, "payer")?;
    if let Some(foreign) = params
        .escrow_inputs
        .iter()
        .find(|r| r.asset_id != constants.locked_asset_id)
    {
        return Err(Error::Draft(format!(
            "escrow input {} holds asset {}, expected {}",
            foreign.resource_id, foreign.asset_id, constants.locked_asset_id
        )));
    }
    let locked = sum_of(&params.escrow_inputs, &constants.locked_asset_id)?;
    if locked != 1 {
        return Err(Error::UnexpectedEscrowBalance { found: locked });
    }

    for (asset_id, required) in constants.payer_requirements()? {
        let available = sum_of(&params.payer_inputs, &asset_id)?;
        if available < required {
            return Err(Error::InsufficientFunds {
                asset_id,
                required,
                available,
            });
        }
    }

    let mut draft = TransactionDraft::new();
    for resource in &params.escrow_inputs {
        draft.add_input(*resource);
    }
    for resource in &params.payer_inputs {
        draft.add_input(*resource);
    }
    draft.add_predicate_owner(escrow);

    draft.add_output(Output::coin(
        constants.receiver,
        receiver_amount,
        constants.ask_asset,
    ));
    draft.add_output(Output::coin(
        constants.treasury_address,
        constants.fee_amount,
        constants.fee_asset,
    ));
    draft.add_output(Output::coin(params.payer, 1, constants.locked_asset_id));

    draft.rebalance_change(params.payer)?;
    draft.check_balance().map_err(|v| {
        Error::Draft(format!(
            "asset {} unbalanced after change: inputs {}, required {}",
            v.asset_id, v.inputs, v.required
        ))
    })?;
    Ok(draft)
}

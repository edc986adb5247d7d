use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::swap_predicate::contract::EscrowAccount;
use crate::types::{Address, Output, SpendableResource};

use super::{check_owned, sum_of};

/// Parameters for funding an escrow with its one locked unit.
pub struct DepositDraftParams {
    pub account: EscrowAccount,
    /// Seller moving the locked unit into the escrow.
    pub depositor: Address,
    /// Depositor resources holding at least one locked unit.
    pub depositor_inputs: Vec<SpendableResource>,
}

/// Build the unfunded deposit draft.
///
/// ```text
/// Inputs:  [0..]  depositor resources
/// Outputs: [0]    escrow: 1 locked unit
///          [1..]  change to depositor
/// ```
pub fn build_deposit_draft(params: &DepositDraftParams) -> Result<TransactionDraft> {
    let constants = params.account.constants();
    let escrow = params.account.address();

    if params.depositor == escrow {
        return Err(Error::Draft("escrow cannot fund itself".into()));
    }
    check_owned(&params.depositor_inputs, &params.depositor, "depositor")?;
    let available = sum_of(&params.depositor_inputs, &constants.locked_asset_id)?;
    if available < 1 {
        return Err(Error::InsufficientFunds {
            asset_id: constants.locked_asset_id,
            required: 1,
            available,
        });
    }

    let mut draft = TransactionDraft::new();
    for resource in &params.depositor_inputs {
        draft.add_input(*resource);
    }
    draft.add_output(Output::coin(escrow, 1, constants.locked_asset_id));
    draft.rebalance_change(params.depositor)?;
    Ok(draft)
}

use crate::draft::TransactionDraft;
use crate::error::{Error, Result};
use crate::swap_predicate::contract::EscrowAccount;
use crate::types::{Output, SpendableResource};

use super::{check_owned, sum_of};

/// Parameters for the receiver taking the escrowed unit back.
pub struct ReclaimDraftParams {
    pub account: EscrowAccount,
    /// Everything the escrow holds of the locked asset.
    pub escrow_inputs: Vec<SpendableResource>,
    /// At least one receiver-owned resource; its presence authorises the
    /// owner path of the spend rule.
    pub owner_inputs: Vec<SpendableResource>,
}

/// Build the unfunded reclaim draft.
///
/// ```text
/// Inputs:  [0..E-1]  escrow resources (predicate)
///          [E..]     receiver resources
/// Outputs: [0]       receiver: all locked units
///          [1..]     change to receiver
/// ```
pub fn build_reclaim_draft(params: &ReclaimDraftParams) -> Result<TransactionDraft> {
    let constants = params.account.constants();
    let escrow = params.account.address();

    check_owned(&params.escrow_inputs, &escrow, "escrow")?;
    check_owned(&params.owner_inputs, &constants.receiver, "receiver")?;
    if params.owner_inputs.is_empty() {
        return Err(Error::Draft(
            "reclaim needs at least one input owned by the receiver".into(),
        ));
    }
    let locked = sum_of(&params.escrow_inputs, &constants.locked_asset_id)?;
    if locked == 0 {
        return Err(Error::UnexpectedEscrowBalance { found: 0 });
    }

    let mut draft = TransactionDraft::new();
    for resource in &params.escrow_inputs {
        draft.add_input(*resource);
    }
    for resource in &params.owner_inputs {
        draft.add_input(*resource);
    }
    draft.add_predicate_owner(escrow);
    draft.add_output(Output::coin(
        constants.receiver,
        locked,
        constants.locked_asset_id,
    ));
    draft.rebalance_change(constants.receiver)?;
    Ok(draft)
}

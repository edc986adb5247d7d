use serde::{Deserialize, Serialize};

use crate::chain::ChainBackend;
use crate::error::{Error, Result};
use crate::swap_predicate::contract::EscrowAccount;
use crate::types::SpendableResource;

/// How much of the locked asset an escrow currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscrowFunding {
    /// Nothing deposited yet (or already swapped out).
    Unfunded,
    /// Exactly one unit: ready to be swapped.
    Funded { resources: Vec<SpendableResource> },
    /// More than one unit; only reclaimable.
    Overfunded {
        amount: u64,
        resources: Vec<SpendableResource>,
    },
}

impl EscrowFunding {
    pub fn is_swappable(&self) -> bool {
        matches!(self, EscrowFunding::Funded { .. })
    }

    pub fn resources(&self) -> &[SpendableResource] {
        match self {
            EscrowFunding::Unfunded => &[],
            EscrowFunding::Funded { resources } | EscrowFunding::Overfunded { resources, .. } => {
                resources
            }
        }
    }
}

/// Query the chain for the escrow's holdings of its locked asset.
pub fn escrow_funding<B: ChainBackend + ?Sized>(
    chain: &B,
    account: &EscrowAccount,
) -> Result<EscrowFunding> {
    let resources: Vec<SpendableResource> = chain
        .list_spendable_resources(&account.address(), &account.constants().locked_asset_id)?
        .into_iter()
        .filter(|r| r.amount > 0)
        .collect();
    let amount = resources
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.amount))
        .ok_or(Error::AmountOverflow)?;

    Ok(match amount {
        0 => EscrowFunding::Unfunded,
        1 => EscrowFunding::Funded { resources },
        _ => EscrowFunding::Overfunded { amount, resources },
    })
}

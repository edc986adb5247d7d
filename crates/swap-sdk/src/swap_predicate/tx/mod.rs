//! Draft builders for the three transactions an escrow takes part in.

pub mod deposit;
pub mod reclaim;
pub mod swap;

use crate::error::{Error, Result};
use crate::types::{Address, AssetId, SpendableResource};

fn check_owned(resources: &[SpendableResource], owner: &Address, role: &str) -> Result<()> {
    match resources.iter().find(|r| &r.owner != owner) {
        Some(r) => Err(Error::Draft(format!(
            "{role} input {} is owned by {}, not {owner}",
            r.resource_id, r.owner
        ))),
        None => Ok(()),
    }
}

fn sum_of(resources: &[SpendableResource], asset_id: &AssetId) -> Result<u64> {
    resources
        .iter()
        .filter(|r| &r.asset_id == asset_id)
        .try_fold(0u64, |acc, r| {
            acc.checked_add(r.amount).ok_or(Error::AmountOverflow)
        })
}

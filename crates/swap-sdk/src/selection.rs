use crate::chain::ChainBackend;
use crate::error::{Error, Result};
use crate::types::{Address, AssetId, ResourceId, SpendableResource};

/// Greedily pick `owner`'s resources of `asset_id` until they cover `amount`.
///
/// Resources are taken in the order given (the provider's order). Resources
/// of other owners or assets, zero-amount resources and anything in `exclude`
/// are skipped. A zero `amount` selects nothing.
///
/// Fails with [`Error::InsufficientFunds`] iff the eligible total is below
/// `amount`; `available` reports that total.
pub fn select_resources(
    owner: &Address,
    asset_id: &AssetId,
    amount: u64,
    candidates: &[SpendableResource],
    exclude: &[ResourceId],
) -> Result<Vec<SpendableResource>> {
    if amount == 0 {
        return Ok(Vec::new());
    }

    let mut selected = Vec::new();
    let mut covered: u64 = 0;
    let eligible = candidates.iter().filter(|r| {
        &r.owner == owner
            && &r.asset_id == asset_id
            && r.amount > 0
            && !exclude.contains(&r.resource_id)
    });

    for resource in eligible.clone() {
        selected.push(*resource);
        covered = covered.saturating_add(resource.amount);
        if covered >= amount {
            return Ok(selected);
        }
    }

    let available = eligible.fold(0u64, |acc, r| acc.saturating_add(r.amount));
    Err(Error::InsufficientFunds {
        asset_id: *asset_id,
        required: amount,
        available,
    })
}

/// Query `owner`'s spendable resources of `asset_id` and select from them.
pub fn select_from_chain<B: ChainBackend + ?Sized>(
    chain: &B,
    owner: &Address,
    asset_id: &AssetId,
    amount: u64,
    exclude: &[ResourceId],
) -> Result<Vec<SpendableResource>> {
    if amount == 0 {
        return Ok(Vec::new());
    }
    let candidates = chain.list_spendable_resources(owner, asset_id)?;
    let selected = select_resources(owner, asset_id, amount, &candidates, exclude)?;
    log::debug!(
        "selected {} of {} resources of {asset_id} for {owner} (target {amount})",
        selected.len(),
        candidates.len()
    );
    Ok(selected)
}

//! Fixtures for exercising the swap pipeline without a live node.

use crate::chain::MemoryChain;
use crate::fee::LinearCostModel;
use crate::network::Network;
use crate::sdk::{SwapConfig, SwapSdk};
use crate::submit::RetryPolicy;
use crate::swap_predicate::contract::EscrowAccount;
use crate::swap_predicate::params::{
    ASK_AMOUNT, ASK_ASSET, ConfigurableConstants, FEE_AMOUNT, FEE_ASSET, LOCKED_ASSET_ID,
    RECEIVER, TREASURY_ADDRESS,
};
use crate::swap_predicate::template::{ConfigurableLayout, PredicateTemplate};
use crate::types::{Address, AssetId, SpendableResource};

// ---------------------------------------------------------------------------
// Parties and assets
// ---------------------------------------------------------------------------

pub const RECEIVER_ADDR: Address = Address::new([0x11; 32]);
pub const TREASURY: Address = Address::new([0x22; 32]);
pub const PAYER: Address = Address::new([0x50; 32]);

/// Ask asset.
pub const ASSET_X: AssetId = AssetId::new([0x0a; 32]);
/// A second payment asset, for split-fee swaps.
pub const ASSET_Y: AssetId = AssetId::new([0x0b; 32]);
/// Locked (non-fungible) asset.
pub const ASSET_N: AssetId = AssetId::new([0x0d; 32]);
/// Network fee asset of [`Network::Local`].
pub const GAS: AssetId = AssetId::new([0x00; 32]);

pub const ASK: u64 = 1_000;
pub const FEE: u64 = 10;

// ---------------------------------------------------------------------------
// Predicate template
// ---------------------------------------------------------------------------

const TEMPLATE_LEN: usize = 512;
const CONFIGURABLES_AT: usize = 256;

/// Slots packed after a 256-byte code section, in declaration order.
pub fn sample_layout() -> ConfigurableLayout {
    let slots = [
        (FEE_AMOUNT, 0),
        (FEE_ASSET, 8),
        (TREASURY_ADDRESS, 40),
        (ASK_AMOUNT, 72),
        (ASK_ASSET, 80),
        (RECEIVER, 112),
        (LOCKED_ASSET_ID, 144),
    ];
    ConfigurableLayout::new(
        slots
            .into_iter()
            .map(|(name, rel)| (name, CONFIGURABLES_AT + rel)),
    )
    .expect("sample layout has unique names")
}

/// A 512-byte template with a deterministic code section.
pub fn sample_template() -> PredicateTemplate {
    let bytecode: Vec<u8> = (0..TEMPLATE_LEN)
        .map(|i| if i < CONFIGURABLES_AT { (i * 7 % 251) as u8 } else { 0 })
        .collect();
    PredicateTemplate::new(1, bytecode, sample_layout()).expect("sample template is valid")
}

/// Ask 1000 X, fee 10 X to the treasury, locking one unit of N.
pub fn sample_constants() -> ConfigurableConstants {
    ConfigurableConstants {
        fee_amount: FEE,
        fee_asset: ASSET_X,
        treasury_address: TREASURY,
        ask_amount: ASK,
        ask_asset: ASSET_X,
        receiver: RECEIVER_ADDR,
        locked_asset_id: ASSET_N,
    }
}

/// Like [`sample_constants`] with the treasury cut paid in Y.
pub fn split_fee_constants() -> ConfigurableConstants {
    ConfigurableConstants {
        fee_asset: ASSET_Y,
        ..sample_constants()
    }
}

// ---------------------------------------------------------------------------
// Chain fixtures
// ---------------------------------------------------------------------------

/// Config for [`Network::Local`] with no retry backoff.
pub fn local_config() -> SwapConfig {
    SwapConfig {
        retry: RetryPolicy::immediate(3),
        ..SwapConfig::for_network(Network::Local)
    }
}

/// An SDK over an empty in-memory chain.
pub fn local_sdk() -> SwapSdk<MemoryChain> {
    let config = local_config();
    SwapSdk::new(
        MemoryChain::with_cost_model(config.cost_model),
        sample_template(),
        config,
    )
}

/// Credit `amount` of the locked asset to the escrow for `constants`.
pub fn fund_escrow(
    sdk: &SwapSdk<MemoryChain>,
    constants: ConfigurableConstants,
    amount: u64,
) -> (EscrowAccount, Option<SpendableResource>) {
    let account = sdk.escrow_account(constants);
    let unit = (amount > 0)
        .then(|| sdk.chain().credit(account.address(), constants.locked_asset_id, amount));
    (account, unit)
}

/// A cost model that makes every draft free.
pub fn zero_cost_model() -> LinearCostModel {
    LinearCostModel {
        base_gas: 0,
        gas_per_input: 0,
        gas_per_predicate_input: 0,
        gas_per_output: 0,
        gas_per_byte: 0,
        gas_price: 0,
    }
}

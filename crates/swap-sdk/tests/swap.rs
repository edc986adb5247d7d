use std::collections::HashMap;

use swap_sdk::testing::{
    ASK, ASSET_N, ASSET_X, ASSET_Y, FEE, GAS, PAYER, RECEIVER_ADDR, TREASURY, fund_escrow,
    local_sdk, sample_constants, sample_layout, split_fee_constants,
};
use swap_sdk::{
    ChainBackend, DraftPurpose, Error, ErrorKind, EscrowFunding, MemoryChain, Output,
    PredicateTemplate, RetryPolicy, Stage, SwapSdk, TransactionDraft, simulate, submit_with_retry,
};

const GAS_FLOAT: u64 = 1_000_000;

fn assert_conserves(draft: &TransactionDraft) {
    for asset_id in draft.assets() {
        let inputs = draft.input_total(&asset_id).unwrap();
        let outputs = draft.output_total(&asset_id).unwrap();
        assert!(
            inputs >= outputs + draft.fee_for(&asset_id),
            "asset {asset_id}: inputs {inputs} < outputs {outputs} + fee"
        );
    }
    assert!(draft.check_balance().is_ok());
}

fn funded_sdk(payer_x: u64) -> SwapSdk<MemoryChain> {
    let sdk = local_sdk();
    fund_escrow(&sdk, sample_constants(), 1);
    if payer_x > 0 {
        sdk.chain().credit(PAYER, ASSET_X, payer_x);
    }
    sdk.chain().credit(PAYER, GAS, GAS_FLOAT);
    sdk
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn swap_pays_receiver_and_treasury_and_delivers_unit() {
    let sdk = funded_sdk(1_200);
    let constants = sample_constants();
    let prepared = sdk.prepare_swap(constants, PAYER).unwrap();

    assert_eq!(prepared.purpose, DraftPurpose::Swap);
    assert_eq!(
        &prepared.draft.outputs[..3],
        &[
            Output::coin(RECEIVER_ADDR, 990, ASSET_X),
            Output::coin(TREASURY, 10, ASSET_X),
            Output::coin(PAYER, 1, ASSET_N),
        ]
    );
    assert!(prepared.draft.outputs[3..].iter().all(|o| o.is_change() && o.to == PAYER));
    assert!(prepared.report.is_valid());
    assert_conserves(&prepared.draft);

    let result = sdk.submit(&prepared).unwrap();
    assert_eq!(result.tx_id, prepared.draft.id());

    let chain = sdk.chain();
    let escrow = prepared.account.address();
    assert_eq!(chain.balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 990);
    assert_eq!(chain.balance(&TREASURY, &ASSET_X).unwrap(), 10);
    assert_eq!(chain.balance(&PAYER, &ASSET_N).unwrap(), 1);
    assert_eq!(chain.balance(&PAYER, &ASSET_X).unwrap(), 200);
    assert_eq!(
        chain.balance(&PAYER, &GAS).unwrap(),
        GAS_FLOAT - prepared.draft.fee_bound
    );
    assert_eq!(chain.balance(&escrow, &ASSET_N).unwrap(), 0);
    assert_eq!(
        sdk.escrow_funding(&prepared.account).unwrap(),
        EscrowFunding::Unfunded
    );
}

#[test]
fn payer_short_of_ask_is_insufficient_before_building() {
    let sdk = funded_sdk(500);
    let err = sdk.prepare_swap(sample_constants(), PAYER).unwrap_err();
    assert_eq!(err.stage, Stage::SelectPayer);
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    match err.error {
        Error::InsufficientFunds {
            asset_id,
            required,
            available,
        } => {
            assert_eq!(asset_id, ASSET_X);
            assert_eq!(required, 1_000);
            assert_eq!(available, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_escrow_is_unexpected_balance() {
    let sdk = local_sdk();
    sdk.chain().credit(PAYER, ASSET_X, 5_000);
    let err = sdk.prepare_swap(sample_constants(), PAYER).unwrap_err();
    assert_eq!(err.stage, Stage::SelectEscrow);
    assert!(matches!(
        err.error,
        Error::UnexpectedEscrowBalance { found: 0 }
    ));
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[test]
fn overfunded_escrow_is_unexpected_balance() {
    let sdk = funded_sdk(1_000);
    fund_escrow(&sdk, sample_constants(), 1);
    let err = sdk.prepare_swap(sample_constants(), PAYER).unwrap_err();
    assert!(matches!(
        err.error,
        Error::UnexpectedEscrowBalance { found: 2 }
    ));
}

#[test]
fn fee_above_ask_is_rejected_before_selection() {
    // Escrow is empty and the payer broke: selection would fail differently.
    let sdk = local_sdk();
    let mut constants = sample_constants();
    constants.fee_amount = 1_500;
    let err = sdk.prepare_swap(constants, PAYER).unwrap_err();
    assert_eq!(err.stage, Stage::Build);
    assert!(matches!(
        err.error,
        Error::ZeroOrNegativeFee {
            fee_amount: 1_500,
            ask_amount: 1_000
        }
    ));
}

#[test]
fn fee_equal_to_ask_pays_receiver_nothing() {
    let sdk = local_sdk();
    let constants = swap_sdk::ConfigurableConstants {
        fee_amount: ASK,
        ..sample_constants()
    };
    fund_escrow(&sdk, constants, 1);
    sdk.chain().credit(PAYER, ASSET_X, ASK);
    sdk.chain().credit(PAYER, GAS, GAS_FLOAT);
    let prepared = sdk.prepare_swap(constants, PAYER).unwrap();
    assert_eq!(prepared.draft.outputs[0], Output::coin(RECEIVER_ADDR, 0, ASSET_X));
    assert_eq!(prepared.draft.outputs[1], Output::coin(TREASURY, ASK, ASSET_X));
    assert!(prepared.report.is_valid());
}

#[test]
fn split_fee_asset_pays_treasury_in_its_own_asset() {
    let sdk = local_sdk();
    let constants = split_fee_constants();
    fund_escrow(&sdk, constants, 1);
    sdk.chain().credit(PAYER, ASSET_X, ASK - FEE);
    sdk.chain().credit(PAYER, ASSET_Y, 25);
    sdk.chain().credit(PAYER, GAS, GAS_FLOAT);

    let prepared = sdk.prepare_swap(constants, PAYER).unwrap();
    assert_eq!(
        &prepared.draft.outputs[..3],
        &[
            Output::coin(RECEIVER_ADDR, 990, ASSET_X),
            Output::coin(TREASURY, 10, ASSET_Y),
            Output::coin(PAYER, 1, ASSET_N),
        ]
    );
    assert_conserves(&prepared.draft);

    sdk.submit(&prepared).unwrap();
    assert_eq!(sdk.chain().balance(&TREASURY, &ASSET_Y).unwrap(), 10);
    assert_eq!(sdk.chain().balance(&PAYER, &ASSET_Y).unwrap(), 15);
    assert_eq!(sdk.chain().balance(&PAYER, &ASSET_X).unwrap(), 0);
}

#[test]
fn split_fee_asset_requires_fee_funds() {
    let sdk = local_sdk();
    let constants = split_fee_constants();
    fund_escrow(&sdk, constants, 1);
    sdk.chain().credit(PAYER, ASSET_X, 5_000);
    sdk.chain().credit(PAYER, GAS, GAS_FLOAT);
    let err = sdk.prepare_swap(constants, PAYER).unwrap_err();
    assert_eq!(err.stage, Stage::SelectPayer);
    assert!(matches!(
        err.error,
        Error::InsufficientFunds { asset_id, required: 10, available: 0 } if asset_id == ASSET_Y
    ));
}

#[test]
fn payer_without_network_fee_funds_fails_fee_stage() {
    let sdk = local_sdk();
    fund_escrow(&sdk, sample_constants(), 1);
    sdk.chain().credit(PAYER, ASSET_X, 1_000);
    let err = sdk.prepare_swap(sample_constants(), PAYER).unwrap_err();
    assert_eq!(err.stage, Stage::Fee);
    assert!(matches!(err.error, Error::FeeFundingFailed { available: 0, .. }));
    assert!(err.error.is_retryable());
}

// ---------------------------------------------------------------------------
// Simulation and submission
// ---------------------------------------------------------------------------

#[test]
fn simulation_is_idempotent_and_side_effect_free() {
    let sdk = funded_sdk(1_000);
    let prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    let before = sdk.chain().snapshot().unwrap();

    let first = simulate(&prepared.draft, sdk.chain(), &[prepared.account]).unwrap();
    let second = simulate(&prepared.draft, sdk.chain(), &[prepared.account]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, prepared.report);
    assert_eq!(sdk.chain().snapshot().unwrap(), before);
}

#[test]
fn tampered_draft_fails_spend_rule() {
    let sdk = funded_sdk(1_000);
    let prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    let mut draft = prepared.draft.clone();
    draft.outputs[0].amount -= 1;
    draft.outputs[1].amount += 1;
    let err = sdk.simulate(&draft, &prepared.account).unwrap_err();
    assert_eq!(err.stage, Stage::Simulate);
    assert_eq!(err.kind(), ErrorKind::SimulationRejected);
}

#[test]
fn spent_input_makes_submission_stale() {
    let sdk = funded_sdk(1_000);
    sdk.chain().credit(PAYER, ASSET_X, 1_000);
    let prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();

    let payer_input = prepared
        .draft
        .inputs
        .iter()
        .find(|r| r.owner == PAYER && r.asset_id == ASSET_X)
        .unwrap();
    assert!(sdk.chain().consume(&payer_input.resource_id).unwrap());

    let err = sdk.submit(&prepared).unwrap_err();
    assert_eq!(err.stage, Stage::Simulate);
    assert_eq!(err.kind(), ErrorKind::StaleResource);
    assert!(!err.error.is_retryable());
    assert_eq!(sdk.chain().submission_attempts().unwrap(), 0);

    // A draft that goes stale after simulation is refused by the node.
    let err = submit_with_retry(sdk.chain(), &prepared.draft, &RetryPolicy::immediate(3))
        .unwrap_err();
    assert!(matches!(err, Error::StaleResource(id) if id == payer_input.resource_id));
    assert_eq!(sdk.chain().submission_attempts().unwrap(), 1);

    let rebuilt = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    assert!(!rebuilt.draft.contains_input(&payer_input.resource_id));
    sdk.submit(&rebuilt).unwrap();
    assert_eq!(sdk.chain().balance(&PAYER, &ASSET_N).unwrap(), 1);
}

#[test]
fn transient_failures_are_retried_under_one_key() {
    let sdk = funded_sdk(1_000);
    let prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    sdk.chain().fail_next_submissions(2).unwrap();

    let result = sdk.submit(&prepared).unwrap();
    assert_eq!(result.attempts, 3);

    // A duplicate submission is deduplicated, not applied twice.
    let again = submit_with_retry(sdk.chain(), &prepared.draft, &RetryPolicy::immediate(1))
        .unwrap();
    assert_eq!(again.tx_id, result.tx_id);
    assert_eq!(sdk.chain().balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 990);

    // Resubmitting through the SDK simulates first and sees spent inputs.
    let err = sdk.submit(&prepared).unwrap_err();
    assert_eq!(err.stage, Stage::Simulate);
    assert_eq!(err.kind(), ErrorKind::StaleResource);
}

#[test]
fn edited_prepared_draft_is_simulated_before_submission() {
    let sdk = funded_sdk(1_000);
    let mut prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    prepared.draft.predicate_owners.clear();
    prepared.draft.outputs[0] = Output::coin(PAYER, ASK - FEE, ASSET_X);

    let err = sdk.submit(&prepared).unwrap_err();
    assert_eq!(err.stage, Stage::Simulate);
    assert_eq!(err.kind(), ErrorKind::SimulationRejected);
    assert_eq!(sdk.chain().submission_attempts().unwrap(), 0);
    assert_eq!(sdk.chain().balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 0);
}

#[test]
fn prepared_account_must_match_its_constants() {
    let sdk = funded_sdk(1_000);
    let mut prepared = sdk.prepare_swap(sample_constants(), PAYER).unwrap();
    let mut forged = sample_constants();
    forged.receiver = PAYER;
    let forged_account = sdk.escrow_account(forged);
    // Splice the real escrow address onto the forged constants.
    let mut value = serde_json::to_value(forged_account).unwrap();
    value["address"] = serde_json::to_value(prepared.account.address()).unwrap();
    prepared.account = serde_json::from_value(value).unwrap();

    let err = sdk.submit(&prepared).unwrap_err();
    assert_eq!(err.stage, Stage::Derive);
    assert_eq!(sdk.chain().submission_attempts().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Two-phase flow
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_swap() {
    let sdk = local_sdk();
    let constants = sample_constants();
    sdk.chain().credit(RECEIVER_ADDR, ASSET_N, 1);
    sdk.chain().credit(RECEIVER_ADDR, GAS, GAS_FLOAT);
    sdk.chain().credit(PAYER, ASSET_X, ASK);
    sdk.chain().credit(PAYER, GAS, GAS_FLOAT);

    let account = sdk.escrow_account(constants);
    assert_eq!(sdk.escrow_funding(&account).unwrap(), EscrowFunding::Unfunded);

    let deposit = sdk.prepare_deposit(constants, RECEIVER_ADDR).unwrap();
    assert_eq!(deposit.purpose, DraftPurpose::Deposit);
    assert_eq!(
        deposit.draft.outputs[0],
        Output::coin(account.address(), 1, ASSET_N)
    );
    sdk.submit(&deposit).unwrap();
    assert!(sdk.escrow_funding(&account).unwrap().is_swappable());

    let swap = sdk.prepare_swap(constants, PAYER).unwrap();
    sdk.submit(&swap).unwrap();
    assert_eq!(sdk.chain().balance(&PAYER, &ASSET_N).unwrap(), 1);
    assert_eq!(sdk.chain().balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 990);
}

#[test]
fn receiver_reclaims_deposit() {
    let sdk = local_sdk();
    let constants = sample_constants();
    let (account, _) = fund_escrow(&sdk, constants, 1);
    sdk.chain().credit(RECEIVER_ADDR, GAS, GAS_FLOAT);

    let reclaim = sdk.prepare_reclaim(constants).unwrap();
    assert_eq!(reclaim.purpose, DraftPurpose::Reclaim);
    assert_eq!(reclaim.party, RECEIVER_ADDR);
    assert!(reclaim.report.is_valid());
    sdk.submit(&reclaim).unwrap();

    assert_eq!(sdk.chain().balance(&RECEIVER_ADDR, &ASSET_N).unwrap(), 1);
    assert_eq!(sdk.escrow_funding(&account).unwrap(), EscrowFunding::Unfunded);

    // Nothing left to swap.
    let err = sdk.prepare_swap(constants, PAYER).unwrap_err();
    assert!(matches!(err.error, Error::UnexpectedEscrowBalance { found: 0 }));
}

#[test]
fn reclaim_recovers_overfunded_escrow() {
    let sdk = local_sdk();
    let constants = sample_constants();
    fund_escrow(&sdk, constants, 1);
    fund_escrow(&sdk, constants, 1);
    sdk.chain().credit(RECEIVER_ADDR, GAS, GAS_FLOAT);
    let reclaim = sdk.prepare_reclaim(constants).unwrap();
    assert_eq!(reclaim.draft.outputs[0], Output::coin(RECEIVER_ADDR, 2, ASSET_N));
    sdk.submit(&reclaim).unwrap();
    assert_eq!(sdk.chain().balance(&RECEIVER_ADDR, &ASSET_N).unwrap(), 2);
}

// ---------------------------------------------------------------------------
// Binding and templates
// ---------------------------------------------------------------------------

#[test]
fn bound_form_drives_the_same_escrow() {
    let sdk = funded_sdk(1_000);
    let form: HashMap<String, String> = sample_constants().to_form();
    let bound = sdk.bind_constants(&form).unwrap();
    assert_eq!(bound, sample_constants());

    let mut bad = form.clone();
    bad.insert("ASK_AMOUNT".into(), "-5".into());
    let err = sdk.bind_constants(&bad).unwrap_err();
    assert_eq!(err.stage, Stage::Bind);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let prepared = sdk.prepare_swap(bound, PAYER).unwrap();
    assert!(prepared.report.is_valid());
}

#[test]
fn template_loads_from_binary_and_abi() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("swap_predicate.bin");
    let abi = dir.path().join("swap_predicate-abi.json");

    let template = swap_sdk::testing::sample_template();
    std::fs::write(&bin, template.bytecode()).unwrap();
    let configurables: Vec<serde_json::Value> = swap_sdk::CONSTANT_NAMES
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name,
                "offset": sample_layout().offset(name).unwrap(),
            })
        })
        .collect();
    std::fs::write(
        &abi,
        serde_json::json!({ "configurables": configurables }).to_string(),
    )
    .unwrap();

    let loaded = PredicateTemplate::from_files(1, &bin, &abi).unwrap();
    assert_eq!(loaded, template);
    assert_eq!(
        swap_sdk::derive_escrow_address(&loaded, &sample_constants()),
        swap_sdk::derive_escrow_address(&template, &sample_constants())
    );
}

#[test]
fn escrow_listing_comes_from_the_chain_backend() {
    let sdk = funded_sdk(0);
    let account = sdk.escrow_account(sample_constants());
    let listed = sdk
        .chain()
        .list_spendable_resources(&account.address(), &ASSET_N)
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].amount, 1);
}

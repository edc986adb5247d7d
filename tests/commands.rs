use std::collections::HashMap;

use swap_desk_lib::commands::{
    bind_swap_form, derive_escrow, escrow_status, get_app_state, prepare_deposit, prepare_reclaim,
    prepare_swap, set_network, submit_prepared,
};
use swap_desk_lib::{SnapshotChainAdapter, SwapDesk};
use swap_sdk::testing::{
    ASSET_N, ASSET_X, GAS, PAYER, RECEIVER_ADDR, TREASURY, sample_constants, sample_template,
};
use swap_sdk::{EscrowFunding, MemoryChain, Output};

fn form() -> HashMap<String, String> {
    sample_constants().to_form()
}

/// Seed a chain snapshot with a receiver holding the locked unit and a
/// funded payer, then open the desk over it.
fn seeded_desk(dir: &std::path::Path) -> SwapDesk {
    let chain = MemoryChain::default();
    chain.credit(RECEIVER_ADDR, ASSET_N, 1);
    chain.credit(RECEIVER_ADDR, GAS, 1_000_000);
    chain.credit(PAYER, ASSET_X, 1_500);
    chain.credit(PAYER, GAS, 1_000_000);
    SnapshotChainAdapter::new(dir).save(&chain).unwrap();
    SwapDesk::open(dir.to_path_buf(), sample_template()).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn form_binding_reports_the_bad_field() {
    let mut bad = form();
    bad.insert("RECEIVER".into(), "0x1234".into());
    let err = bind_swap_form(&bad).unwrap_err();
    assert!(err.contains("RECEIVER"), "{err}");
    assert_eq!(bind_swap_form(&form()).unwrap(), sample_constants());
}

#[tokio::test]
async fn first_launch_defaults_to_local() {
    let dir = tempfile::tempdir().unwrap();
    let desk = SwapDesk::open(dir.path().to_path_buf(), sample_template()).unwrap();
    let state = get_app_state(&desk).await.unwrap();
    assert_eq!(state.network_status.network, "local");
    assert!(state.swaps.is_empty());

    let state = set_network(&desk, "testnet".into()).await.unwrap();
    assert_eq!(state.network_status.network, "testnet");
    assert!(set_network(&desk, "moon".into()).await.is_err());
}

#[tokio::test]
async fn derive_escrow_reports_split() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());
    let view = derive_escrow(&desk, form()).await.unwrap();
    assert_eq!(view.receiver_amount, 990);
    assert_eq!(view.payer_requirements.len(), 1);
    assert_eq!(view.payer_requirements[0].amount, 1_000);

    let mut too_much = form();
    too_much.insert("FEE_AMOUNT".into(), "1500".into());
    assert!(derive_escrow(&desk, too_much).await.is_err());
}

#[tokio::test]
async fn deposit_swap_round_trip_persists() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());

    let status = escrow_status(&desk, form()).await.unwrap();
    assert_eq!(status.funding, EscrowFunding::Unfunded);

    let deposit = prepare_deposit(&desk, form(), RECEIVER_ADDR.to_string())
        .await
        .unwrap();
    assert_eq!(
        deposit.outputs[0],
        Output::coin(status.address, 1, ASSET_N)
    );
    submit_prepared(&desk, deposit.prepared).await.unwrap();
    assert!(escrow_status(&desk, form())
        .await
        .unwrap()
        .funding
        .is_swappable());

    let swap = prepare_swap(&desk, form(), PAYER.to_string()).await.unwrap();
    assert!(swap.simulation.is_valid());
    assert_eq!(swap.draft_hex.len() % 2, 0);
    let result = submit_prepared(&desk, swap.prepared).await.unwrap();
    assert_eq!(result.attempts, 1);

    // History and chain survive a restart.
    let reopened = SwapDesk::open(dir.path().to_path_buf(), sample_template()).unwrap();
    let state = get_app_state(&reopened).await.unwrap();
    let submitted: Vec<_> = state
        .swaps
        .iter()
        .filter(|s| s.status == "submitted")
        .collect();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().any(|s| s.purpose == "swap"));

    let node = reopened.node().unwrap();
    let chain = node.sdk().chain();
    assert_eq!(chain.balance(&PAYER, &ASSET_N).unwrap(), 1);
    assert_eq!(chain.balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 990);
    assert_eq!(chain.balance(&TREASURY, &ASSET_X).unwrap(), 10);
}

#[tokio::test]
async fn failed_submission_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());
    let deposit = prepare_deposit(&desk, form(), RECEIVER_ADDR.to_string())
        .await
        .unwrap();
    let spent = deposit.prepared.draft.inputs[0].resource_id;
    desk.node().unwrap().sdk().chain().consume(&spent).unwrap();

    let err = submit_prepared(&desk, deposit.prepared).await.unwrap_err();
    assert!(err.contains("simulate failed"), "{err}");
    assert!(err.contains("spent"), "{err}");
    let state = get_app_state(&desk).await.unwrap();
    let record = state.swaps.iter().find(|s| s.id == deposit.draft_id).unwrap();
    assert_eq!(record.status, "failed");
    assert!(record.error.is_some());
}

#[tokio::test]
async fn edited_prepared_swap_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());
    let deposit = prepare_deposit(&desk, form(), RECEIVER_ADDR.to_string())
        .await
        .unwrap();
    submit_prepared(&desk, deposit.prepared).await.unwrap();

    let mut prepared = prepare_swap(&desk, form(), PAYER.to_string())
        .await
        .unwrap()
        .prepared;
    prepared.draft.predicate_owners.clear();
    prepared.draft.outputs[0] = Output::coin(PAYER, 990, ASSET_X);

    let err = submit_prepared(&desk, prepared).await.unwrap_err();
    assert!(err.contains("simulate failed"), "{err}");
    let node = desk.node().unwrap();
    assert_eq!(node.sdk().chain().balance(&PAYER, &ASSET_N).unwrap(), 0);
    assert_eq!(node.sdk().chain().balance(&RECEIVER_ADDR, &ASSET_X).unwrap(), 0);
}

#[tokio::test]
async fn reclaim_after_deposit() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());
    let deposit = prepare_deposit(&desk, form(), RECEIVER_ADDR.to_string())
        .await
        .unwrap();
    submit_prepared(&desk, deposit.prepared).await.unwrap();

    let reclaim = prepare_reclaim(&desk, form()).await.unwrap();
    submit_prepared(&desk, reclaim.prepared).await.unwrap();
    let status = escrow_status(&desk, form()).await.unwrap();
    assert_eq!(status.funding, EscrowFunding::Unfunded);
}

#[tokio::test]
async fn bad_payer_address_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let desk = seeded_desk(dir.path());
    let err = prepare_swap(&desk, form(), "not-an-address".into())
        .await
        .unwrap_err();
    assert!(err.contains("payer"), "{err}");
}

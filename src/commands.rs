use std::collections::HashMap;

use serde::Serialize;

use swap_sdk::{
    Address, AssetId, ConfigurableConstants, EscrowFunding, Network, Output, PreparedDraft,
    SimulationReport, SubmitResult,
};

use crate::state::{AppState, SwapRecord};
use crate::SwapDesk;

// ============================================================================
// Views (sent to frontend)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowView {
    pub address: Address,
    pub constants: ConfigurableConstants,
    pub receiver_amount: u64,
    pub payer_requirements: Vec<AmountView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountView {
    pub asset_id: AssetId,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowStatusView {
    pub address: Address,
    pub funding: EscrowFunding,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedView {
    pub draft_id: String,
    pub escrow_address: Address,
    pub outputs: Vec<Output>,
    pub fee_bound: u64,
    /// Canonical draft bytes, hex encoded.
    pub draft_hex: String,
    pub simulation: SimulationReport,
    /// Hand back to [`submit_prepared`] unchanged.
    pub prepared: PreparedDraft,
}

fn parse_address(label: &str, raw: &str) -> Result<Address, String> {
    raw.parse()
        .map_err(|e| format!("invalid {label} address: {e}"))
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn purpose_str(prepared: &PreparedDraft) -> String {
    serde_json::to_value(prepared.purpose)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn record_for(prepared: &PreparedDraft, network: Network, status: &str) -> SwapRecord {
    let at = now();
    SwapRecord {
        id: prepared.draft.id().to_string(),
        purpose: purpose_str(prepared),
        network: network.as_str().to_string(),
        status: status.to_string(),
        escrow_address: prepared.account.address().to_string(),
        party: prepared.party.to_string(),
        fee_bound: prepared.draft.fee_bound,
        tx_id: None,
        error: None,
        created_at: at.clone(),
        updated_at: at,
    }
}

fn remember(desk: &SwapDesk, record: SwapRecord) -> Result<(), String> {
    let mut mgr = desk
        .manager()
        .lock()
        .map_err(|_| "state lock failed".to_string())?;
    mgr.upsert_swap(record);
    Ok(())
}

fn prepared_view(desk: &SwapDesk, prepared: PreparedDraft) -> Result<PreparedView, String> {
    remember(desk, record_for(&prepared, desk.network()?, "prepared"))?;
    Ok(PreparedView {
        draft_id: prepared.draft.id().to_string(),
        escrow_address: prepared.account.address(),
        outputs: prepared.draft.outputs.clone(),
        fee_bound: prepared.draft.fee_bound,
        draft_hex: hex::encode(prepared.draft.encode()),
        simulation: prepared.report.clone(),
        prepared,
    })
}

// ============================================================================
// Network & app state
// ============================================================================

pub async fn get_app_state(desk: &SwapDesk) -> Result<AppState, String> {
    let mgr = desk
        .manager()
        .lock()
        .map_err(|_| "state lock failed".to_string())?;
    if !mgr.is_initialized() {
        return Err("Not initialized - select a network first".to_string());
    }
    Ok(mgr.snapshot())
}

pub async fn set_network(desk: &SwapDesk, network: String) -> Result<AppState, String> {
    let network: Network = network.parse()?;
    desk.set_network(network)
}

// ============================================================================
// Escrow commands
// ============================================================================

/// Validate the seven raw form fields.
pub fn bind_swap_form(form: &HashMap<String, String>) -> Result<ConfigurableConstants, String> {
    ConfigurableConstants::bind(form).map_err(|e| e.to_string())
}

pub async fn derive_escrow(
    desk: &SwapDesk,
    form: HashMap<String, String>,
) -> Result<EscrowView, String> {
    let constants = bind_swap_form(&form)?;
    let receiver_amount = constants.receiver_amount().map_err(|e| e.to_string())?;
    let payer_requirements = constants
        .payer_requirements()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|(asset_id, amount)| AmountView { asset_id, amount })
        .collect();
    let account = desk.node()?.sdk().escrow_account(constants);
    Ok(EscrowView {
        address: account.address(),
        constants,
        receiver_amount,
        payer_requirements,
    })
}

pub async fn escrow_status(
    desk: &SwapDesk,
    form: HashMap<String, String>,
) -> Result<EscrowStatusView, String> {
    let constants = bind_swap_form(&form)?;
    let (account, funding) = desk
        .node()?
        .escrow_status(constants)
        .await
        .map_err(|e| e.to_string())?;
    Ok(EscrowStatusView {
        address: account.address(),
        funding,
    })
}

// ============================================================================
// Prepare & submit
// ============================================================================

pub async fn prepare_deposit(
    desk: &SwapDesk,
    form: HashMap<String, String>,
    depositor: String,
) -> Result<PreparedView, String> {
    let constants = bind_swap_form(&form)?;
    let depositor = parse_address("depositor", &depositor)?;
    let prepared = desk
        .node()?
        .prepare_deposit(constants, depositor)
        .await
        .map_err(|e| e.to_string())?;
    prepared_view(desk, prepared)
}

pub async fn prepare_swap(
    desk: &SwapDesk,
    form: HashMap<String, String>,
    payer: String,
) -> Result<PreparedView, String> {
    let constants = bind_swap_form(&form)?;
    let payer = parse_address("payer", &payer)?;
    let prepared = desk
        .node()?
        .prepare_swap(constants, payer)
        .await
        .map_err(|e| e.to_string())?;
    prepared_view(desk, prepared)
}

pub async fn prepare_reclaim(
    desk: &SwapDesk,
    form: HashMap<String, String>,
) -> Result<PreparedView, String> {
    let constants = bind_swap_form(&form)?;
    let prepared = desk
        .node()?
        .prepare_reclaim(constants)
        .await
        .map_err(|e| e.to_string())?;
    prepared_view(desk, prepared)
}

/// Submit a prepared draft and persist the resulting chain state.
pub async fn submit_prepared(
    desk: &SwapDesk,
    prepared: PreparedDraft,
) -> Result<SubmitResult, String> {
    let network = desk.network()?;
    let mut record = record_for(&prepared, network, "submitted");
    match desk.node()?.submit(prepared).await {
        Ok(result) => {
            desk.persist_chain()?;
            record.tx_id = Some(result.tx_id.to_string());
            remember(desk, record)?;
            Ok(result)
        }
        Err(e) => {
            log::warn!("submit failed: {e}");
            record.status = "failed".to_string();
            record.error = Some(e.to_string());
            remember(desk, record)?;
            Err(e.to_string())
        }
    }
}

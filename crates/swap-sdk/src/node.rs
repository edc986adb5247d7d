//! `SwapNode`: async front for [`SwapSdk`].
//!
//! SDK calls block on chain queries, so each one runs on
//! `tokio::task::spawn_blocking`. Escrow and payer selection are independent
//! and run concurrently.

use std::sync::Arc;

use crate::chain::ChainBackend;
use crate::error::{NodeError, Stage, StageExt, SwapError};
use crate::sdk::{PreparedDraft, SubmitResult, SwapSdk};
use crate::swap_predicate::contract::EscrowAccount;
use crate::swap_predicate::funding::EscrowFunding;
use crate::swap_predicate::params::ConfigurableConstants;
use crate::types::Address;

// ── Struct ──────────────────────────────────────────────────────────────────

/// Cloneable async handle to a shared [`SwapSdk`].
pub struct SwapNode<B> {
    sdk: Arc<SwapSdk<B>>,
}

impl<B> Clone for SwapNode<B> {
    fn clone(&self) -> Self {
        Self {
            sdk: Arc::clone(&self.sdk),
        }
    }
}

// ── Construction ────────────────────────────────────────────────────────────

impl<B> SwapNode<B>
where
    B: ChainBackend + Send + Sync + 'static,
{
    pub fn new(sdk: SwapSdk<B>) -> Self {
        Self { sdk: Arc::new(sdk) }
    }

    pub fn sdk(&self) -> &SwapSdk<B> {
        &self.sdk
    }

    // ── Internal: spawn_blocking SDK helper ─────────────────────────────

    async fn with_sdk<F, R>(&self, f: F) -> Result<R, NodeError>
    where
        F: FnOnce(&SwapSdk<B>) -> Result<R, SwapError> + Send + 'static,
        R: Send + 'static,
    {
        let sdk = Arc::clone(&self.sdk);
        tokio::task::spawn_blocking(move || f(&sdk))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?
            .map_err(NodeError::Swap)
    }

    // ── Escrow queries ──────────────────────────────────────────────────

    pub async fn escrow_status(
        &self,
        constants: ConfigurableConstants,
    ) -> Result<(EscrowAccount, EscrowFunding), NodeError> {
        self.with_sdk(move |sdk| {
            let account = sdk.escrow_account(constants);
            let funding = sdk.escrow_funding(&account)?;
            Ok((account, funding))
        })
        .await
    }

    // ── Prepare ─────────────────────────────────────────────────────────

    /// Like [`SwapSdk::prepare_swap`], selecting escrow and payer resources
    /// concurrently.
    pub async fn prepare_swap(
        &self,
        constants: ConfigurableConstants,
        payer: Address,
    ) -> Result<PreparedDraft, NodeError> {
        constants.receiver_amount().at(Stage::Build)?;
        let account = self.sdk.escrow_account(constants);

        let (escrow_inputs, payer_inputs) = tokio::join!(
            self.with_sdk(move |sdk| sdk.select_escrow(&account)),
            self.with_sdk(move |sdk| sdk.select_payer(&account, &payer)),
        );
        let escrow_inputs = escrow_inputs?;
        let payer_inputs = payer_inputs?;

        self.with_sdk(move |sdk| sdk.assemble_swap(account, payer, escrow_inputs, payer_inputs))
            .await
    }

    pub async fn prepare_deposit(
        &self,
        constants: ConfigurableConstants,
        depositor: Address,
    ) -> Result<PreparedDraft, NodeError> {
        self.with_sdk(move |sdk| sdk.prepare_deposit(constants, depositor))
            .await
    }

    pub async fn prepare_reclaim(
        &self,
        constants: ConfigurableConstants,
    ) -> Result<PreparedDraft, NodeError> {
        self.with_sdk(move |sdk| sdk.prepare_reclaim(constants)).await
    }

    // ── Submit ──────────────────────────────────────────────────────────

    pub async fn submit(&self, prepared: PreparedDraft) -> Result<SubmitResult, NodeError> {
        self.with_sdk(move |sdk| sdk.submit(&prepared)).await
    }
}

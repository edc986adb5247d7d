pub mod chain;
pub mod draft;
pub mod error;
pub mod fee;
pub mod network;
pub mod node;
pub mod sdk;
pub mod selection;
pub mod simulate;
pub mod submit;
pub mod swap_predicate;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Core types
pub use chain::{ChainBackend, ChainSnapshot, DryRunReceipt, MemoryChain, SubmitError};
pub use draft::{BalanceViolation, TransactionDraft};
pub use error::{Error, ErrorKind, NodeError, Result, Stage, StageExt, SwapError};
pub use network::Network;
pub use node::SwapNode;
pub use sdk::{DraftPurpose, PreparedDraft, SubmitResult, SwapConfig, SwapSdk};
pub use types::{
    Address, AssetId, IdParseError, IdempotencyKey, Output, OutputKind, ResourceId,
    SpendableResource, TxId, parse_id,
};

// Fees, selection, simulation, submission
pub use fee::{CostModel, FeeEstimator, LinearCostModel};
pub use selection::{select_from_chain, select_resources};
pub use simulate::{RejectReason, SimulationReport, Verdict, simulate};
pub use submit::{RetryPolicy, SubmitOutcome, idempotency_key, submit_with_retry};

// Swap predicate
pub use swap_predicate::contract::{EscrowAccount, derive_escrow_address};
pub use swap_predicate::funding::{EscrowFunding, escrow_funding};
pub use swap_predicate::params::{CONSTANT_NAMES, ConfigurableConstants, ConstantValue};
pub use swap_predicate::root::{code_root, predicate_address};
pub use swap_predicate::rule::{RuleViolation, SpendPath, evaluate_spend_rule};
pub use swap_predicate::template::{ConfigurableLayout, PredicateTemplate};
pub use swap_predicate::tx::deposit::{DepositDraftParams, build_deposit_draft};
pub use swap_predicate::tx::reclaim::{ReclaimDraftParams, build_reclaim_draft};
pub use swap_predicate::tx::swap::{SwapDraftParams, build_swap_draft};

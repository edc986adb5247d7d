use thiserror::Error;

use crate::simulate::RejectReason;
use crate::types::{AssetId, ResourceId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed constant {key}: {reason}")]
    MalformedConstant { key: String, reason: String },

    #[error("invalid predicate template: {0}")]
    InvalidTemplate(String),

    #[error("insufficient funds of asset {asset_id}: required {required}, available {available}")]
    InsufficientFunds {
        asset_id: AssetId,
        required: u64,
        available: u64,
    },

    #[error("escrow must hold exactly 1 unit of the locked asset (found {found})")]
    UnexpectedEscrowBalance { found: u64 },

    #[error("fee amount {fee_amount} exceeds ask amount {ask_amount}")]
    ZeroOrNegativeFee { fee_amount: u64, ask_amount: u64 },

    #[error("fee funding failed: need {required} of the fee asset, payer has {available} more")]
    FeeFundingFailed { required: u64, available: u64 },

    #[error("fee bound {bound} still below network cost {actual} after retry")]
    FeeUnderestimated { bound: u64, actual: u64 },

    #[error("arithmetic overflow while balancing amounts")]
    AmountOverflow,

    #[error("draft construction error: {0}")]
    Draft(String),

    #[error("simulation rejected the draft: {0}")]
    SimulationRejected(RejectReason),

    #[error("resource {0} was already spent; rebuild the draft from fresh queries")]
    StaleResource(ResourceId),

    #[error("chain query error: {0}")]
    Chain(String),

    #[error("submission failed: {0}")]
    Submission(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Recovery class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; re-prompt.
    Validation,
    /// Fund the party or abort.
    InsufficientFunds,
    /// Constants or programming error; fatal to this swap attempt.
    Fatal,
    /// Retry with a broader resource scope.
    FeeFunding,
    /// Rebuild or abort.
    SimulationRejected,
    /// Must rebuild from fresh queries, never resubmit.
    StaleResource,
    /// Provider or transport failure.
    Transport,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedConstant { .. } | Error::InvalidTemplate(_) => ErrorKind::Validation,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::UnexpectedEscrowBalance { .. }
            | Error::ZeroOrNegativeFee { .. }
            | Error::AmountOverflow
            | Error::Draft(_) => ErrorKind::Fatal,
            Error::FeeFundingFailed { .. } | Error::FeeUnderestimated { .. } => {
                ErrorKind::FeeFunding
            }
            Error::SimulationRejected(RejectReason::StaleResource(_)) | Error::StaleResource(_) => {
                ErrorKind::StaleResource
            }
            Error::SimulationRejected(_) => ErrorKind::SimulationRejected,
            Error::Chain(_) | Error::Submission(_) => ErrorKind::Transport,
        }
    }

    /// Whether the same attempt may be repeated without rebuilding the draft.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::FeeFunding | ErrorKind::Transport)
    }
}

/// Pipeline stage at which a swap attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Bind,
    Derive,
    SelectEscrow,
    SelectPayer,
    Build,
    Fee,
    Simulate,
    Submit,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Bind => "bind constants",
            Stage::Derive => "derive escrow address",
            Stage::SelectEscrow => "select escrow resources",
            Stage::SelectPayer => "select payer resources",
            Stage::Build => "build draft",
            Stage::Fee => "estimate fee",
            Stage::Simulate => "simulate",
            Stage::Submit => "submit",
        };
        f.write_str(name)
    }
}

/// An [`Error`] tagged with the stage that produced it.
#[derive(Debug)]
pub struct SwapError {
    pub stage: Stage,
    pub error: Error,
}

impl SwapError {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for SwapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Extension for tagging a [`Result`] with a [`Stage`].
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, SwapError>;
}

impl<T> StageExt<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, SwapError> {
        self.map_err(|e| SwapError::new(stage, e))
    }
}

/// Errors produced by [`SwapNode`](crate::node::SwapNode).
#[derive(Debug)]
pub enum NodeError {
    /// A staged SDK operation failed.
    Swap(SwapError),
    /// A `spawn_blocking` task failed to join.
    Task(String),
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Swap(e) => write!(f, "swap error: {e}"),
            NodeError::Task(e) => write!(f, "task join error: {e}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Swap(e) => Some(e),
            NodeError::Task(_) => None,
        }
    }
}

impl From<SwapError> for NodeError {
    fn from(e: SwapError) -> Self {
        NodeError::Swap(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_recovery_classes() {
        let malformed = Error::MalformedConstant {
            key: "FEE_AMOUNT".into(),
            reason: "empty".into(),
        };
        assert_eq!(malformed.kind(), ErrorKind::Validation);
        assert_eq!(
            Error::UnexpectedEscrowBalance { found: 0 }.kind(),
            ErrorKind::Fatal
        );
        assert_eq!(
            Error::StaleResource(ResourceId::new([1; 32])).kind(),
            ErrorKind::StaleResource
        );
        assert_eq!(
            Error::SimulationRejected(RejectReason::StaleResource(ResourceId::new([1; 32]))).kind(),
            ErrorKind::StaleResource
        );
    }

    #[test]
    fn stale_resource_is_not_retryable() {
        assert!(!Error::StaleResource(ResourceId::new([1; 32])).is_retryable());
        assert!(Error::Chain("timeout".into()).is_retryable());
    }

    #[test]
    fn swap_error_names_stage() {
        let res: Result<()> = Err(Error::ZeroOrNegativeFee {
            fee_amount: 1500,
            ask_amount: 1000,
        });
        let msg = res.at(Stage::Build).unwrap_err().to_string();
        assert!(msg.starts_with("build draft failed"), "{msg}");
    }
}

//! Errors for the root history and identity state registry.

use thiserror::Error;

use gist_core::{Classified, ErrorKind, FieldElement, IdentityId};
use gist_crypto::SmtError;
use gist_zkp::VerifyError;

/// Root history failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("length should be greater than 0")]
    LengthZero,

    #[error("history length limit exceeded: requested {requested}, limit {limit}")]
    LengthLimitExceeded { requested: usize, limit: usize },

    #[error("out of bounds of root history: start {start} + length {length} > {len}")]
    OutOfBounds {
        start: usize,
        length: usize,
        len: usize,
    },

    #[error("root does not exist: {0}")]
    RootNotExist(FieldElement),

    /// Appending would move `(timestamp, block)` backwards.
    #[error(
        "non-monotonic history entry: ({timestamp}, {block}) after ({last_timestamp}, {last_block})"
    )]
    NonMonotonic {
        last_timestamp: u64,
        last_block: u64,
        timestamp: u64,
        block: u64,
    },
}

impl Classified for HistoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::LengthZero | Self::OutOfBounds { .. } | Self::NonMonotonic { .. } => {
                ErrorKind::Validation
            }
            Self::LengthLimitExceeded { .. } => ErrorKind::Capacity,
            Self::RootNotExist(_) => ErrorKind::NotFound,
        }
    }
}

/// State transition and state query failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("identity id must not be zero")]
    ZeroId,

    #[error("new state must not be zero")]
    ZeroState,

    #[error("state {state} already exists for {id}")]
    StateAlreadyExists { id: IdentityId, state: FieldElement },

    #[error("old state is genesis but {0} already exists")]
    IdentityAlreadyExists(IdentityId),

    #[error("state {state} is not the genesis state of {id}")]
    NotGenesisState { id: IdentityId, state: FieldElement },

    #[error("identity does not exist: {0}")]
    IdentityNotFound(IdentityId),

    #[error("state {state} does not exist for {id}")]
    StateNotFound { id: IdentityId, state: FieldElement },

    #[error("no multiple set in the same block for {id} (block {block})")]
    SameBlockTransition { id: IdentityId, block: u64 },

    #[error("old state does not match the latest state of {id}: expected {expected}, got {actual}")]
    OldStateMismatch {
        id: IdentityId,
        expected: FieldElement,
        actual: FieldElement,
    },

    #[error("no state transition verifier configured")]
    TransitionVerifierMissing,

    #[error("state transition proof is not valid")]
    InvalidTransitionProof,

    #[error(transparent)]
    Verifier(#[from] VerifyError),

    #[error(transparent)]
    Smt(#[from] SmtError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl Classified for StateError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroId
            | Self::ZeroState
            | Self::StateAlreadyExists { .. }
            | Self::IdentityAlreadyExists(_)
            | Self::NotGenesisState { .. }
            | Self::SameBlockTransition { .. }
            | Self::OldStateMismatch { .. }
            | Self::TransitionVerifierMissing => ErrorKind::Validation,
            Self::IdentityNotFound(_) | Self::StateNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransitionProof => ErrorKind::Verification,
            Self::Verifier(e) => e.kind(),
            Self::Smt(e) => e.kind(),
            Self::History(e) => e.kind(),
        }
    }
}

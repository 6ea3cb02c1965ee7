//! Request lifecycle and proof verification errors.

use thiserror::Error;

use gist_core::{Address, Classified, ErrorKind, FieldElement, IdentityId, RequestId, ValidatorId};
use gist_zkp::VerifyError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request id doesn't exist: {0}")]
    RequestNotFound(RequestId),

    #[error("request is disabled: {0}")]
    RequestDisabled(RequestId),

    #[error("validator is not whitelisted: {0}")]
    ValidatorNotWhitelisted(ValidatorId),

    /// Caller is neither the registry owner nor, where allowed, the request
    /// controller.
    #[error("{caller} is not allowed to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("userID {user_id} does not correspond to the requester {requester}")]
    UserIdMismatch {
        requester: IdentityId,
        user_id: FieldElement,
    },

    #[error("{validator} does not expose a {field} signal")]
    MissingSignal {
        validator: ValidatorId,
        field: &'static str,
    },

    #[error("proof rejected for {0}")]
    ProofRejected(RequestId),

    #[error(transparent)]
    Verifier(#[from] VerifyError),

    #[error("linked proof verification needs more than 1 request, got {0}")]
    LinkedProofArity(usize),

    #[error("can't find linkID for {0}")]
    LinkIdNotFound(RequestId),

    #[error(
        "linked proof mismatch: {request_id} has linkID {request_link_id}, \
         {linked_request_id} has linkID {linked_request_link_id}"
    )]
    LinkedProofError {
        request_id: RequestId,
        linked_request_id: RequestId,
        request_link_id: FieldElement,
        linked_request_link_id: FieldElement,
    },

    #[error("no proof status for {requester} on {request_id}")]
    ProofStatusNotFound {
        requester: IdentityId,
        request_id: RequestId,
    },

    #[error("length should be greater than 0")]
    LengthZero,

    #[error("length limit exceeded: requested {requested}, limit {limit}")]
    LengthLimitExceeded { requested: usize, limit: usize },

    #[error("start index out of bounds: {start} >= {len}")]
    StartOutOfBounds { start: usize, len: usize },
}

impl Classified for RequestError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::RequestNotFound(_)
            | Self::LinkIdNotFound(_)
            | Self::ProofStatusNotFound { .. } => ErrorKind::NotFound,
            Self::ValidatorNotWhitelisted(_)
            | Self::Unauthorized { .. }
            | Self::UserIdMismatch { .. } => ErrorKind::Authorization,
            Self::ProofRejected(_) | Self::LinkedProofError { .. } => ErrorKind::Verification,
            Self::Verifier(e) => e.kind(),
            Self::LengthLimitExceeded { .. } => ErrorKind::Capacity,
            Self::RequestDisabled(_)
            | Self::MissingSignal { .. }
            | Self::LinkedProofArity(_)
            | Self::LengthZero
            | Self::StartOutOfBounds { .. } => ErrorKind::Validation,
        }
    }
}

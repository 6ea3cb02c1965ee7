use thiserror::Error;

use gist_core::{Classified, ErrorKind, FieldElement};

/// Errors raised by the sparse Merkle tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmtError {
    #[error("leaf already exists at index {0}")]
    DuplicateLeaf(FieldElement),

    #[error("no leaf at index {0}")]
    LeafNotFound(FieldElement),

    #[error("root does not exist: {0}")]
    RootNotFound(FieldElement),

    /// Placing the leaf would require a level at or beyond `max_depth`.
    #[error("max depth reached (max depth {max_depth})")]
    MaxDepthReached { max_depth: usize },

    /// Depth may only grow and never past the ceiling.
    #[error("invalid max depth {requested}: must exceed {current} and not exceed {ceiling}")]
    InvalidMaxDepth {
        requested: usize,
        current: usize,
        ceiling: usize,
    },

    /// Node storage does not hold a hash reachable from a known root.
    #[error("node storage is missing node {0}")]
    MissingNode(FieldElement),
}

impl Classified for SmtError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateLeaf(_) | Self::InvalidMaxDepth { .. } => ErrorKind::Validation,
            Self::LeafNotFound(_) | Self::RootNotFound(_) | Self::MissingNode(_) => {
                ErrorKind::NotFound
            }
            Self::MaxDepthReached { .. } => ErrorKind::Capacity,
        }
    }
}

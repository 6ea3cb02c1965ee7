//! # Error Taxonomy
//!
//! Every crate in the workspace defines its own `thiserror` enum with
//! precise variants. Those variants are grouped into five kinds so callers
//! can react without matching on crate-specific detail.
//!
//! ## Guarantees
//!
//! - Every failure of a mutating operation leaves the tree, the root
//!   history, and the request registry exactly as they were.
//! - `Capacity` failures are deterministic: identical inputs against
//!   identical state always fail the same way.

use serde::{Deserialize, Serialize};

/// Coarse classification of a registry failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad arguments: zero lengths, bad offsets, zero ids, stale states.
    Validation,
    /// Unknown root, request, identity, or status.
    NotFound,
    /// Caller lacks the role, or the validator is not whitelisted.
    Authorization,
    /// Tree depth or history page cap exceeded.
    Capacity,
    /// The proof verifier rejected the submission.
    Verification,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Capacity => "capacity",
            Self::Verification => "verification",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every error type in the workspace.
pub trait Classified {
    fn kind(&self) -> ErrorKind;
}

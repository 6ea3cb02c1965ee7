//! # Proof Verifier Trait
//!
//! The capability every request delegates its cryptographic check to. One
//! implementation exists per proof scheme; the whitelist entry referenced by
//! a request decides which one runs.
//!
//! ## Extension
//!
//! `ProofVerifier` is open: the host supplies real backends (Groth16, PLONK,
//! signature checks) from its own crates. Only the registry owner can put a
//! verifier on the whitelist, and that whitelist is the trust boundary.
//!
//! ## Public Signals
//!
//! Verifiers receive public signals as an ordered list of field elements.
//! A [`SignalLayout`] names the positions the registry cares about. Two names
//! are reserved:
//!
//! - [`USER_ID_FIELD`]: the identity the proof is about. Proof statuses are
//!   keyed by it.
//! - [`LINK_ID_FIELD`]: the nonce shared by linked proofs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gist_core::{hex, Classified, ErrorKind, FieldElement};

/// Signal name carrying the identity the proof is about.
pub const USER_ID_FIELD: &str = "userID";

/// Signal name carrying the link nonce shared by linked proofs.
pub const LINK_ID_FIELD: &str = "linkID";

/// Error during proof verification.
///
/// A verifier returns `Ok(false)` for a well-formed proof that does not
/// verify, and an error when the inputs cannot be checked at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proof is structurally malformed.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The request parameters cannot be decoded by this verifier.
    #[error("malformed request params: {0}")]
    MalformedParams(String),
    /// Fewer public signals than the layout requires.
    #[error("expected at least {expected} public signals, got {actual}")]
    SignalCount { expected: usize, actual: usize },
}

impl Classified for VerifyError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedProof(_) => ErrorKind::Verification,
            Self::MalformedParams(_) | Self::SignalCount { .. } => ErrorKind::Validation,
        }
    }
}

/// Scheme-specific opaque proof bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProofPayload(pub Vec<u8>);

impl ProofPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ProofPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for ProofPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Whether a submission must come from the identity the proof is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequesterBinding {
    /// Any requester may submit; the status lands under the proven identity.
    Unbound,
    /// The requester must equal the `userID` signal.
    RequesterIsUser,
}

/// Named positions within a verifier's public signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalLayout {
    fields: Vec<(String, usize)>,
}

impl SignalLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// `userID` at position 0.
    pub fn user_bound() -> Self {
        Self::new().with_field(USER_ID_FIELD, 0)
    }

    /// Add or move a named field.
    pub fn with_field(mut self, name: &str, position: usize) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_string(), position));
        self
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| *p)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, usize)> {
        self.fields.iter().map(|(n, p)| (n.as_str(), *p))
    }

    /// Smallest signal count that covers every named position.
    pub fn min_signals(&self) -> usize {
        self.fields.iter().map(|(_, p)| p + 1).max().unwrap_or(0)
    }

    /// Pull every named field out of `signals`.
    pub fn extract(
        &self,
        signals: &[FieldElement],
    ) -> Result<BTreeMap<String, FieldElement>, VerifyError> {
        let expected = self.min_signals();
        if signals.len() < expected {
            return Err(VerifyError::SignalCount {
                expected,
                actual: signals.len(),
            });
        }
        Ok(self
            .fields
            .iter()
            .map(|(name, pos)| (name.clone(), signals[*pos]))
            .collect())
    }
}

/// Capability that checks a proof against public signals and the
/// request's opaque parameters.
///
/// Implementations must be pure: a call that errors or returns `false` has
/// no side effects.
pub trait ProofVerifier: Send + Sync + fmt::Debug {
    /// Version string recorded in every proof status this verifier produces.
    fn version(&self) -> &str;

    fn layout(&self) -> &SignalLayout;

    fn binding(&self) -> RequesterBinding;

    /// `Ok(true)` if the proof is valid for these signals and params.
    ///
    /// # Errors
    ///
    /// [`VerifyError::MalformedProof`] for undecodable proofs,
    /// [`VerifyError::SignalCount`] when signals are missing.
    fn verify(
        &self,
        public_signals: &[FieldElement],
        proof: &ProofPayload,
        params: &[u8],
    ) -> Result<bool, VerifyError>;
}

//! # Mock Proof Verifier
//!
//! A deterministic, transparent verifier. A "proof" is the SHA-256 digest of
//! the request params and the public signals, so a test can produce a valid
//! proof with [`MockProofVerifier::prove`] and an invalid one by changing any
//! input.
//!
//! ## Security Notice
//!
//! This verifier provides NO zero-knowledge guarantees. Anyone who knows the
//! public signals can produce a passing proof.

use sha2::{Digest, Sha256};

use gist_core::FieldElement;

use crate::traits::{
    ProofPayload, ProofVerifier, RequesterBinding, SignalLayout, VerifyError, LINK_ID_FIELD,
};

const DOMAIN: &[u8] = b"gist.mock-proof.v1";

/// Deterministic SHA-256 verifier.
#[derive(Debug, Clone)]
pub struct MockProofVerifier {
    version: String,
    layout: SignalLayout,
    binding: RequesterBinding,
}

impl MockProofVerifier {
    /// Unbound verifier with `userID` at position 0.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            layout: SignalLayout::user_bound(),
            binding: RequesterBinding::Unbound,
        }
    }

    /// Requester-bound verifier with `userID` at 0 and `linkID` at 1.
    pub fn linked(version: impl Into<String>) -> Self {
        Self::new(version)
            .with_layout(SignalLayout::user_bound().with_field(LINK_ID_FIELD, 1))
            .with_binding(RequesterBinding::RequesterIsUser)
    }

    pub fn with_layout(mut self, layout: SignalLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_binding(mut self, binding: RequesterBinding) -> Self {
        self.binding = binding;
        self
    }

    /// The only proof this verifier accepts for `signals` under `params`.
    pub fn prove(&self, signals: &[FieldElement], params: &[u8]) -> ProofPayload {
        ProofPayload(digest(signals, params).to_vec())
    }
}

fn digest(signals: &[FieldElement], params: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update((params.len() as u64).to_be_bytes());
    hasher.update(params);
    for signal in signals {
        hasher.update(signal.as_bytes());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

impl ProofVerifier for MockProofVerifier {
    fn version(&self) -> &str {
        &self.version
    }

    fn layout(&self) -> &SignalLayout {
        &self.layout
    }

    fn binding(&self) -> RequesterBinding {
        self.binding
    }

    fn verify(
        &self,
        public_signals: &[FieldElement],
        proof: &ProofPayload,
        params: &[u8],
    ) -> Result<bool, VerifyError> {
        if proof.0.len() != 32 {
            return Err(VerifyError::MalformedProof(format!(
                "mock proofs are 32 bytes, got {}",
                proof.0.len()
            )));
        }
        let expected = self.layout.min_signals();
        if public_signals.len() < expected {
            return Err(VerifyError::SignalCount {
                expected,
                actual: public_signals.len(),
            });
        }
        Ok(proof.0 == digest(public_signals, params))
    }
}

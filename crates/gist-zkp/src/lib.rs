//! # gist-zkp: Proof Verifier Capability
//!
//! Zero-knowledge circuit math is out of scope for the registry. This crate
//! defines the boundary instead: an object-safe [`ProofVerifier`]
//! trait that the request coordinator calls through a whitelist entry, and a
//! [`MockProofVerifier`] that makes the whole request lifecycle testable.
//!
//! ## Backends
//!
//! - `mock`: deterministic SHA-256 transparent proofs. Always available.
//! - Groth16 / PLONK backends live in host crates and implement the same
//!   trait directly.

pub mod mock;
pub mod traits;

pub use mock::MockProofVerifier;
pub use traits::{
    ProofPayload, ProofVerifier, RequesterBinding, SignalLayout, VerifyError, LINK_ID_FIELD,
    USER_ID_FIELD,
};

//! # Field-Element Hashing
//!
//! [`HashEngine`] is the stateless hash used for tree nodes, leaves, and
//! identity keys. The default [`Sha256FieldHasher`] is domain-separated by
//! arity so a two-input node hash can never collide with a three-input leaf
//! hash over the same bytes:
//!
//! - Input: `arity(8 bytes, big-endian) || e_0 || e_1 || ...` with each
//!   element as 32 big-endian bytes. The arity is the full input count, so
//!   no two lengths share a prefix.
//! - Output: `SHA256(input)` with the top three bits cleared, which keeps
//!   every hash below 2^253 and therefore inside the BN254 scalar field.
//!
//! A Poseidon engine drops in behind the same trait when the tree must be
//! provable inside a circuit.

use sha2::{Digest, Sha256};

use gist_core::FieldElement;

/// Deterministic hash from field elements to a field element.
pub trait HashEngine: Send + Sync + std::fmt::Debug {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement;
}

/// SHA-256 hashing reduced into the scalar field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha256FieldHasher;

impl HashEngine for Sha256FieldHasher {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        let mut hasher = Sha256::new();
        // usize is at most 64 bits on every supported target.
        hasher.update((inputs.len() as u64).to_be_bytes());
        for input in inputs {
            hasher.update(input.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out[0] &= 0x1f;
        FieldElement::from_be_bytes(out)
    }
}

impl<H: HashEngine + ?Sized> HashEngine for std::sync::Arc<H> {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        (**self).hash(inputs)
    }
}

//! # Genesis Identity Derivation
//!
//! An identity id commits to the identity's type and its genesis state, so
//! the first transition of an identity can be checked without any prior
//! registration.
//!
//! ## Layout
//!
//! Read as 31 little-endian bytes, an id is:
//!
//! ```text
//! [0..2)   type prefix, big-endian
//! [2..29)  lower 27 bytes of the genesis state, big-endian
//! [29..31) checksum: 16-bit sum of bytes [0..29), little-endian
//! ```
//!
//! Only the lower 27 bytes of the state participate. States that differ in
//! their five leading bytes derive the same id.

use gist_core::{FieldElement, IdentityId};

const TYPE_LEN: usize = 2;
const GENESIS_LEN: usize = 27;
const CHECKSUM_OFFSET: usize = TYPE_LEN + GENESIS_LEN;

/// Deterministic id derivation from a type prefix and a genesis state.
pub trait IdentityIdDeriver: Send + Sync + std::fmt::Debug {
    fn derive_id(&self, type_prefix: [u8; 2], genesis_state: &FieldElement) -> IdentityId;

    /// Whether `state` is the genesis state `id` was derived from.
    fn is_genesis_state(&self, id: &IdentityId, state: &FieldElement) -> bool;
}

/// The checksummed type-and-genesis layout described in the module docs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenesisIdDeriver;

impl GenesisIdDeriver {
    /// Type prefix encoded in `id`.
    pub fn id_type(id: &IdentityId) -> [u8; 2] {
        let le = id.as_field().to_le_bytes();
        [le[0], le[1]]
    }
}

fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)))
}

impl IdentityIdDeriver for GenesisIdDeriver {
    fn derive_id(&self, type_prefix: [u8; 2], genesis_state: &FieldElement) -> IdentityId {
        let state = genesis_state.to_be_bytes();
        let mut le = [0u8; 32];
        le[..TYPE_LEN].copy_from_slice(&type_prefix);
        le[TYPE_LEN..CHECKSUM_OFFSET].copy_from_slice(&state[32 - GENESIS_LEN..]);
        let sum = checksum(&le[..CHECKSUM_OFFSET]);
        le[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
        IdentityId(FieldElement::from_le_bytes(le))
    }

    fn is_genesis_state(&self, id: &IdentityId, state: &FieldElement) -> bool {
        self.derive_id(Self::id_type(id), state) == *id
    }
}

//! # gist-crypto: Hashing and the Sparse Merkle Tree
//!
//! - [`hash`]: the [`HashEngine`] capability and the SHA-256 default.
//! - [`smt`]: the bounded-depth sparse Merkle tree that binds identities to
//!   their latest state, with existence and non-existence proofs against the
//!   current root or any historical one.
//!
//! ## Crate Policy
//!
//! - Depends only on `gist-core`.
//! - Every tree write is all-or-nothing.

pub mod error;
pub mod hash;
pub mod smt;

pub use error::SmtError;
pub use hash::{HashEngine, Sha256FieldHasher};
pub use smt::{Node, SmtProof, SparseMerkleTree, DEFAULT_MAX_DEPTH, MAX_DEPTH_CEILING};

//! # gist-core: Foundational Types for the GIST Registry
//!
//! This crate defines the primitives shared by every other crate in the
//! workspace: the 256-bit [`FieldElement`], identifier newtypes, the explicit
//! [`BlockContext`] that replaces ambient chain context, the error taxonomy,
//! and the structured events consumed by off-chain indexers.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `IdentityId`, `RequestId`,
//!    `ValidatorId`, `Address`. You cannot pass a request id where an
//!    identity is expected.
//!
//! 2. **No ambient context.** Every mutating operation receives a
//!    `BlockContext` and an explicit principal. Nothing reads a clock.
//!
//! 3. **One error taxonomy.** Every crate-level error maps onto
//!    [`ErrorKind`] through the [`Classified`] trait.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gist-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod context;
pub mod error;
pub mod event;
pub mod field;
pub mod hex;
pub mod identity;

pub use context::BlockContext;
pub use error::{Classified, ErrorKind};
pub use event::{EventJournal, RegistryEvent};
pub use field::{FieldElement, FieldElementError};
pub use identity::{Address, IdentityId, RequestId, ValidatorId};

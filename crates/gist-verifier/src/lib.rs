//! # gist-verifier: Proof Requests and Verification
//!
//! - [`request`]: the [`ProofRequestRegistry`] of request definitions, their
//!   controllers, and the owner-managed validator whitelist.
//! - [`coordinator`]: the [`ProofVerificationCoordinator`] that checks
//!   submissions, records [`ProofStatus`]es, and verifies linked proofs.
//!
//! ## Authorization
//!
//! Callers are plain [`gist_core::Address`] values supplied by the embedding
//! host. The registry owner manages the whitelist; a request's controller is
//! fixed by its first `set_request` and may update, disable, or enable it
//! alongside the owner.

pub mod coordinator;
pub mod error;
pub mod request;
pub mod status;
pub mod whitelist;

pub use coordinator::{ProofVerificationCoordinator, VerifiedResponse};
pub use error::RequestError;
pub use request::{
    ProofRequest, ProofRequestRegistry, RequestDefinition, RequestState, DEFAULT_PAGE_LIMIT,
};
pub use status::ProofStatus;
pub use whitelist::ValidatorWhitelist;

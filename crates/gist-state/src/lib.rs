//! # gist-state: Identity States and Root History
//!
//! - [`history`]: the append-only [`RootHistoryIndex`] with lookup by time
//!   and by block.
//! - [`genesis`]: the [`IdentityIdDeriver`] capability and the checksummed
//!   default layout.
//! - [`registry`]: the [`StateRegistry`] that drives the global tree and
//!   root history together on every identity state transition.

pub mod error;
pub mod genesis;
pub mod history;
pub mod registry;

pub use error::{HistoryError, StateError};
pub use genesis::{GenesisIdDeriver, IdentityIdDeriver};
pub use history::{RootHistoryIndex, RootTransitionEntry, DEFAULT_RETURN_LIMIT};
pub use registry::{StateInfo, StateRegistry, DEFAULT_ID_TYPE};

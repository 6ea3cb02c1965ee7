//! # gist-registry: Embeddable Registry Facade
//!
//! Bundles the identity state registry and the proof request coordinator into
//! one thread-safe [`Registry`], plus the ambient pieces a host needs to run
//! it: environment [`config`], [`telemetry`] setup, and event [`sink`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gist_core::{Address, BlockContext, FieldElement};
//! use gist_registry::{Registry, RegistryConfig, TracingEventSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = RegistryConfig::from_env()?;
//! gist_registry::telemetry::init_from_config(&config)?;
//! let registry = Registry::from_config(&config, Address::repeat_byte(1), Arc::new(TracingEventSink))?;
//!
//! let genesis = FieldElement::from(7u64);
//! let id = registry.derive_id(&genesis);
//! registry.transit_state(BlockContext::new(1_700_000_000, 1), id, genesis, FieldElement::from(8u64), true)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod sink;
pub mod telemetry;

pub use config::{ConfigError, RegistryConfig};
pub use error::RegistryError;
pub use registry::Registry;
pub use sink::{EventSink, MemoryEventSink, TracingEventSink};

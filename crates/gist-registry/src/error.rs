//! Facade error wrapping every component error.

use thiserror::Error;

use gist_core::{Classified, ErrorKind};
use gist_state::StateError;
use gist_verifier::RequestError;

use crate::config::ConfigError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        Classified::kind(self)
    }
}

impl Classified for RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::State(e) => e.kind(),
            Self::Request(e) => e.kind(),
            Self::Config(_) => ErrorKind::Validation,
        }
    }
}

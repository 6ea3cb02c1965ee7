//! Validator whitelist: the verifier capabilities a request may reference.

use std::collections::BTreeMap;
use std::sync::Arc;

use gist_core::ValidatorId;
use gist_zkp::ProofVerifier;

/// Named verifier capabilities approved by the registry owner.
#[derive(Debug, Default, Clone)]
pub struct ValidatorWhitelist {
    entries: BTreeMap<ValidatorId, Arc<dyn ProofVerifier>>,
}

impl ValidatorWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the verifier under `id`.
    pub fn insert(&mut self, id: ValidatorId, verifier: Arc<dyn ProofVerifier>) {
        self.entries.insert(id, verifier);
    }

    pub fn remove(&mut self, id: &ValidatorId) -> Option<Arc<dyn ProofVerifier>> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &ValidatorId) -> Option<&Arc<dyn ProofVerifier>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ValidatorId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

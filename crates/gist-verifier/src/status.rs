//! Per-identity proof outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gist_core::FieldElement;

/// Outcome of the latest successful submission for one identity and one
/// request.
///
/// `fields` holds the named public signals extracted at verification time
/// and is replaced on every successful submission. `raw_values` holds
/// side-channel blobs attached afterwards; each name keeps only its last
/// write and survives resubmission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofStatus {
    pub is_proved: bool,
    pub validator_version: String,
    pub block: u64,
    pub timestamp: u64,
    pub fields: BTreeMap<String, FieldElement>,
    pub raw_values: BTreeMap<String, Vec<u8>>,
}

impl ProofStatus {
    pub fn field(&self, name: &str) -> Option<FieldElement> {
        self.fields.get(name).copied()
    }

    pub fn raw_value(&self, name: &str) -> Option<&[u8]> {
        self.raw_values.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unproved() {
        let status = ProofStatus::default();
        assert!(!status.is_proved);
        assert!(status.validator_version.is_empty());
        assert_eq!(status.block, 0);
        assert!(status.field("userID").is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ProofStatus::default()).unwrap();
        assert_eq!(json["isProved"], false);
        assert_eq!(json["validatorVersion"], "");
    }
}

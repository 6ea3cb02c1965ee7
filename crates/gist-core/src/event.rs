//! # Registry Events
//!
//! Structured records emitted on every successful mutation and consumed by
//! off-chain indexers. Field names and order are part of the external
//! contract: `RequestSet(requestId, controller, metadata, validator, data)`,
//! `ResponseSubmitted(requestId, caller)`, and
//! `StorageFieldRawValueAdded(caller, requestId, fieldName, rawValue)`.
//!
//! Sub-registries record events into an [`EventJournal`] while they mutate.
//! The journal is drained by the owner of the state once the mutation has
//! committed, so a failed call never leaks an event.

use serde::{Serialize, Serializer};

use crate::field::FieldElement;
use crate::hex;
use crate::identity::{Address, IdentityId, RequestId, ValidatorId};

fn as_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

/// A structured registry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum RegistryEvent {
    /// A proof request was created or updated.
    RequestSet {
        request_id: RequestId,
        controller: Address,
        metadata: String,
        validator: ValidatorId,
        #[serde(serialize_with = "as_hex")]
        data: Vec<u8>,
    },
    /// A proof response was verified and its status recorded.
    ResponseSubmitted {
        request_id: RequestId,
        caller: IdentityId,
    },
    /// An opaque side-channel value was attached to a proof status.
    StorageFieldRawValueAdded {
        caller: IdentityId,
        request_id: RequestId,
        field_name: String,
        #[serde(serialize_with = "as_hex")]
        raw_value: Vec<u8>,
    },
    /// An identity moved to a new state and the global root changed.
    StateUpdated {
        id: IdentityId,
        block: u64,
        timestamp: u64,
        state: FieldElement,
    },
    RequestDisabled {
        request_id: RequestId,
        by: Address,
    },
    RequestEnabled {
        request_id: RequestId,
        by: Address,
    },
    ValidatorWhitelisted {
        validator: ValidatorId,
        version: String,
    },
    ValidatorRemoved {
        validator: ValidatorId,
    },
}

impl RegistryEvent {
    /// Event name as seen by indexers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSet { .. } => "RequestSet",
            Self::ResponseSubmitted { .. } => "ResponseSubmitted",
            Self::StorageFieldRawValueAdded { .. } => "StorageFieldRawValueAdded",
            Self::StateUpdated { .. } => "StateUpdated",
            Self::RequestDisabled { .. } => "RequestDisabled",
            Self::RequestEnabled { .. } => "RequestEnabled",
            Self::ValidatorWhitelisted { .. } => "ValidatorWhitelisted",
            Self::ValidatorRemoved { .. } => "ValidatorRemoved",
        }
    }

    /// JSON form of the event, as shipped to indexers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Pending events recorded during a mutation.
#[derive(Debug, Default, Clone)]
pub struct EventJournal {
    pending: Vec<RegistryEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: RegistryEvent) {
        self.pending.push(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

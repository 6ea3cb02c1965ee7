//! # Proof Request Registry
//!
//! Request definitions, their controllers, and the validator whitelist.
//!
//! ## Request Lifecycle
//!
//! ```text
//! Unset --set_request--> Enabled <--disable/enable--> Disabled
//! ```
//!
//! - `set_request` requires a whitelisted validator. The first caller to set
//!   an id becomes its controller; later updates must come from that
//!   controller and never change it.
//! - `disable_request` / `enable_request` are open to the registry owner and
//!   the request controller.
//! - Whitelist changes are owner-only.
//!
//! Every mutation returns the [`RegistryEvent`] describing it. The caller
//! records the event once the mutation has succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gist_core::{Address, RegistryEvent, RequestId, ValidatorId};
use gist_zkp::ProofVerifier;

use crate::error::RequestError;
use crate::whitelist::ValidatorWhitelist;

/// Default cap on a single request page.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Lifecycle state of an existing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Enabled,
    Disabled,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
        })
    }
}

/// The public definition of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefinition {
    pub metadata: String,
    pub validator: ValidatorId,
    pub params: Vec<u8>,
}

/// A request with its controller and lifecycle flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub id: RequestId,
    pub metadata: String,
    pub validator: ValidatorId,
    pub params: Vec<u8>,
    pub controller: Address,
    pub is_disabled: bool,
}

impl ProofRequest {
    pub fn state(&self) -> RequestState {
        if self.is_disabled {
            RequestState::Disabled
        } else {
            RequestState::Enabled
        }
    }

    pub fn definition(&self) -> RequestDefinition {
        RequestDefinition {
            metadata: self.metadata.clone(),
            validator: self.validator.clone(),
            params: self.params.clone(),
        }
    }
}

/// Requests keyed by id, in creation order, with the validator whitelist.
#[derive(Debug, Clone)]
pub struct ProofRequestRegistry {
    owner: Address,
    requests: HashMap<RequestId, ProofRequest>,
    order: Vec<RequestId>,
    by_controller: HashMap<Address, Vec<RequestId>>,
    whitelist: ValidatorWhitelist,
    page_limit: usize,
}

impl ProofRequestRegistry {
    pub fn new(owner: Address) -> Self {
        Self::with_page_limit(owner, DEFAULT_PAGE_LIMIT)
    }

    pub fn with_page_limit(owner: Address, page_limit: usize) -> Self {
        Self {
            owner,
            requests: HashMap::new(),
            order: Vec::new(),
            by_controller: HashMap::new(),
            whitelist: ValidatorWhitelist::new(),
            page_limit,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    pub fn whitelist(&self) -> &ValidatorWhitelist {
        &self.whitelist
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), RequestError> {
        self.require_owner(caller, "transfer ownership")?;
        tracing::info!(from = %self.owner, to = %new_owner, "registry ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    // ─── Whitelist ───────────────────────────────────────────────────

    pub fn add_validator_to_whitelist(
        &mut self,
        caller: Address,
        id: ValidatorId,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<RegistryEvent, RequestError> {
        self.require_owner(caller, "whitelist validators")?;
        let version = verifier.version().to_string();
        self.whitelist.insert(id.clone(), verifier);
        tracing::info!(validator = %id, version = %version, "validator whitelisted");
        Ok(RegistryEvent::ValidatorWhitelisted {
            validator: id,
            version,
        })
    }

    /// Requests already referencing `id` stay registered but can no longer
    /// accept submissions until it is whitelisted again.
    pub fn remove_validator_from_whitelist(
        &mut self,
        caller: Address,
        id: &ValidatorId,
    ) -> Result<RegistryEvent, RequestError> {
        self.require_owner(caller, "remove validators")?;
        self.whitelist
            .remove(id)
            .ok_or_else(|| RequestError::ValidatorNotWhitelisted(id.clone()))?;
        tracing::info!(validator = %id, "validator removed from whitelist");
        Ok(RegistryEvent::ValidatorRemoved {
            validator: id.clone(),
        })
    }

    pub fn is_whitelisted_validator(&self, id: &ValidatorId) -> bool {
        self.whitelist.contains(id)
    }

    /// Verifier behind a whitelisted validator.
    pub fn verifier(&self, id: &ValidatorId) -> Result<Arc<dyn ProofVerifier>, RequestError> {
        self.whitelist
            .get(id)
            .cloned()
            .ok_or_else(|| RequestError::ValidatorNotWhitelisted(id.clone()))
    }

    // ─── Requests ────────────────────────────────────────────────────

    /// Create a request, or update one the caller controls.
    pub fn set_request(
        &mut self,
        caller: Address,
        request_id: RequestId,
        definition: RequestDefinition,
    ) -> Result<RegistryEvent, RequestError> {
        if !self.whitelist.contains(&definition.validator) {
            tracing::warn!(request_id = %request_id, validator = %definition.validator, "request references non-whitelisted validator");
            return Err(RequestError::ValidatorNotWhitelisted(definition.validator));
        }

        let controller = match self.requests.get_mut(&request_id) {
            Some(existing) => {
                if existing.controller != caller {
                    tracing::warn!(request_id = %request_id, caller = %caller, "request update by non-controller rejected");
                    return Err(RequestError::Unauthorized {
                        caller,
                        action: "update a request it does not control",
                    });
                }
                existing.metadata = definition.metadata.clone();
                existing.validator = definition.validator.clone();
                existing.params = definition.params.clone();
                existing.controller
            }
            None => {
                self.requests.insert(
                    request_id,
                    ProofRequest {
                        id: request_id,
                        metadata: definition.metadata.clone(),
                        validator: definition.validator.clone(),
                        params: definition.params.clone(),
                        controller: caller,
                        is_disabled: false,
                    },
                );
                self.order.push(request_id);
                self.by_controller.entry(caller).or_default().push(request_id);
                caller
            }
        };

        tracing::info!(request_id = %request_id, controller = %controller, validator = %definition.validator, "request set");
        Ok(RegistryEvent::RequestSet {
            request_id,
            controller,
            metadata: definition.metadata,
            validator: definition.validator,
            data: definition.params,
        })
    }

    pub fn disable_request(
        &mut self,
        caller: Address,
        request_id: RequestId,
    ) -> Result<RegistryEvent, RequestError> {
        self.set_disabled(caller, request_id, true)?;
        Ok(RegistryEvent::RequestDisabled {
            request_id,
            by: caller,
        })
    }

    pub fn enable_request(
        &mut self,
        caller: Address,
        request_id: RequestId,
    ) -> Result<RegistryEvent, RequestError> {
        self.set_disabled(caller, request_id, false)?;
        Ok(RegistryEvent::RequestEnabled {
            request_id,
            by: caller,
        })
    }

    fn set_disabled(
        &mut self,
        caller: Address,
        request_id: RequestId,
        disabled: bool,
    ) -> Result<(), RequestError> {
        let owner = self.owner;
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(RequestError::RequestNotFound(request_id))?;
        if caller != owner && caller != request.controller {
            tracing::warn!(request_id = %request_id, caller = %caller, "request state change by non-owner non-controller rejected");
            return Err(RequestError::Unauthorized {
                caller,
                action: "change the state of a request it neither owns nor controls",
            });
        }
        request.is_disabled = disabled;
        tracing::info!(request_id = %request_id, state = %request.state(), "request state changed");
        Ok(())
    }

    pub fn get_request(&self, request_id: RequestId) -> Result<RequestDefinition, RequestError> {
        self.get_request_full_info(request_id).map(|r| r.definition())
    }

    pub fn get_request_full_info(&self, request_id: RequestId) -> Result<&ProofRequest, RequestError> {
        self.requests
            .get(&request_id)
            .ok_or(RequestError::RequestNotFound(request_id))
    }

    pub fn request_id_exists(&self, request_id: RequestId) -> bool {
        self.requests.contains_key(&request_id)
    }

    pub fn get_requests_count(&self) -> usize {
        self.order.len()
    }

    pub fn get_requests_count_by_controller(&self, controller: &Address) -> usize {
        self.by_controller.get(controller).map_or(0, Vec::len)
    }

    /// Requests in creation order. The page is cut short at the end.
    pub fn get_requests(&self, offset: usize, length: usize) -> Result<Vec<ProofRequest>, RequestError> {
        self.page_of(&self.order, offset, length)
    }

    pub fn get_requests_by_controller(
        &self,
        controller: &Address,
        offset: usize,
        length: usize,
    ) -> Result<Vec<ProofRequest>, RequestError> {
        let ids = self
            .by_controller
            .get(controller)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        self.page_of(ids, offset, length)
    }

    fn page_of(
        &self,
        ids: &[RequestId],
        offset: usize,
        length: usize,
    ) -> Result<Vec<ProofRequest>, RequestError> {
        if length == 0 {
            return Err(RequestError::LengthZero);
        }
        if length > self.page_limit {
            return Err(RequestError::LengthLimitExceeded {
                requested: length,
                limit: self.page_limit,
            });
        }
        if offset >= ids.len() {
            return Err(RequestError::StartOutOfBounds {
                start: offset,
                len: ids.len(),
            });
        }
        let end = offset.saturating_add(length).min(ids.len());
        Ok(ids[offset..end]
            .iter()
            .filter_map(|id| self.requests.get(id).cloned())
            .collect())
    }

    /// Fails with [`RequestError::Unauthorized`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: Address, action: &'static str) -> Result<(), RequestError> {
        if caller != self.owner {
            tracing::warn!(caller = %caller, action, "owner-only action rejected");
            return Err(RequestError::Unauthorized { caller, action });
        }
        Ok(())
    }
}

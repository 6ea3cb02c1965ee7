//! # Registry Facade
//!
//! One [`Registry`] owns the identity [`StateRegistry`] and the
//! [`ProofVerificationCoordinator`] behind a single `parking_lot::RwLock`.
//!
//! ## Concurrency
//!
//! Mutations take the write lock, so they are serialized. Reads take the read
//! lock and run concurrently with each other. The lock is never held across an
//! await point; the registry is synchronous throughout.
//!
//! ## Events
//!
//! Component events are drained after each mutation and handed to the
//! [`EventSink`] while the write lock is still held, so sinks observe events
//! in commit order. A failed mutation publishes nothing.

use std::sync::Arc;

use parking_lot::RwLock;

use gist_core::{
    Address, BlockContext, FieldElement, IdentityId, RegistryEvent, RequestId, ValidatorId,
};
use gist_crypto::{Sha256FieldHasher, SmtProof, SparseMerkleTree};
use gist_state::{GenesisIdDeriver, RootHistoryIndex, RootTransitionEntry, StateInfo, StateRegistry};
use gist_verifier::{
    ProofRequest, ProofRequestRegistry, ProofStatus, ProofVerificationCoordinator,
    RequestDefinition, VerifiedResponse,
};
use gist_zkp::{ProofPayload, ProofVerifier};

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::sink::{EventSink, TracingEventSink};

/// Everything guarded by the registry lock.
#[derive(Debug)]
struct RegistryState {
    states: StateRegistry,
    verification: ProofVerificationCoordinator,
}

impl RegistryState {
    fn drain_events(&mut self) -> Vec<RegistryEvent> {
        let mut events = self.states.drain_events();
        events.extend(self.verification.drain_events());
        events
    }
}

/// Thread-safe identity state and proof request registry.
#[derive(Debug)]
pub struct Registry {
    state: RwLock<RegistryState>,
    sink: Arc<dyn EventSink>,
}

impl Registry {
    /// Registry with default limits, owned by `owner`, logging events via
    /// [`TracingEventSink`].
    pub fn new(owner: Address) -> Self {
        Self::with_sink(owner, Arc::new(TracingEventSink))
    }

    pub fn with_sink(owner: Address, sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                states: StateRegistry::new(),
                verification: ProofVerificationCoordinator::new(ProofRequestRegistry::new(owner)),
            }),
            sink,
        }
    }

    /// Registry sized by `config`.
    pub fn from_config(
        config: &RegistryConfig,
        owner: Address,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        let gist = SparseMerkleTree::with_max_depth(Sha256FieldHasher, config.smt_max_depth)
            .map_err(gist_state::StateError::from)?;
        let mut states = StateRegistry::with_parts(
            gist,
            RootHistoryIndex::with_return_limit(config.history_return_limit),
            Arc::new(GenesisIdDeriver),
        );
        states.set_default_id_type(config.default_id_type);
        let requests = ProofRequestRegistry::with_page_limit(owner, config.request_page_limit);

        tracing::info!(
            smt_max_depth = config.smt_max_depth,
            history_return_limit = config.history_return_limit,
            request_page_limit = config.request_page_limit,
            owner = %owner,
            "registry configured"
        );
        Ok(Self {
            state: RwLock::new(RegistryState {
                states,
                verification: ProofVerificationCoordinator::new(requests),
            }),
            sink,
        })
    }

    fn mutate<T, E>(
        &self,
        op: impl FnOnce(&mut RegistryState) -> Result<T, E>,
    ) -> Result<T, RegistryError>
    where
        RegistryError: From<E>,
    {
        let mut state = self.state.write();
        let result = op(&mut state);
        let events = state.drain_events();
        if !events.is_empty() {
            self.sink.publish(&events);
        }
        Ok(result?)
    }

    // ─── Administration ──────────────────────────────────────────────

    // Owner-only. The owner is the one held by the request registry.

    pub fn set_transition_verifier(
        &self,
        caller: Address,
        verifier: Option<Arc<dyn ProofVerifier>>,
    ) -> Result<(), RegistryError> {
        self.mutate(|s| {
            s.verification
                .registry()
                .require_owner(caller, "set the transition verifier")?;
            s.states.set_transition_verifier(verifier);
            Ok::<_, RegistryError>(())
        })
    }

    pub fn set_gist_max_depth(&self, caller: Address, depth: usize) -> Result<(), RegistryError> {
        self.mutate(|s| {
            s.verification
                .registry()
                .require_owner(caller, "set the GIST max depth")?;
            Ok::<_, RegistryError>(s.states.set_gist_max_depth(depth)?)
        })
    }

    pub fn set_default_id_type(&self, caller: Address, id_type: [u8; 2]) -> Result<(), RegistryError> {
        self.mutate(|s| {
            s.verification
                .registry()
                .require_owner(caller, "set the default id type")?;
            s.states.set_default_id_type(id_type);
            Ok::<_, RegistryError>(())
        })
    }

    pub fn default_id_type(&self) -> [u8; 2] {
        self.state.read().states.default_id_type()
    }

    pub fn gist_max_depth(&self) -> usize {
        self.state.read().states.gist().max_depth()
    }

    /// Identity id for `genesis_state` under the default type prefix.
    pub fn derive_id(&self, genesis_state: &FieldElement) -> IdentityId {
        self.state.read().states.derive_id(genesis_state)
    }

    pub fn owner(&self) -> Address {
        self.state.read().verification.registry().owner()
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.transfer_ownership(caller, new_owner))
    }

    // ─── State transitions ───────────────────────────────────────────

    /// Returns the new GIST root.
    pub fn transit_state(
        &self,
        ctx: BlockContext,
        id: IdentityId,
        old_state: FieldElement,
        new_state: FieldElement,
        is_old_state_genesis: bool,
    ) -> Result<FieldElement, RegistryError> {
        self.mutate(|s| {
            s.states
                .transit_state(ctx, id, old_state, new_state, is_old_state_genesis)
        })
    }

    pub fn transit_state_with_proof(
        &self,
        ctx: BlockContext,
        id: IdentityId,
        old_state: FieldElement,
        new_state: FieldElement,
        is_old_state_genesis: bool,
        proof: &ProofPayload,
    ) -> Result<FieldElement, RegistryError> {
        self.mutate(|s| {
            s.states.transit_state_with_proof(
                ctx,
                id,
                old_state,
                new_state,
                is_old_state_genesis,
                proof,
            )
        })
    }

    // ─── State queries ───────────────────────────────────────────────

    pub fn id_exists(&self, id: &IdentityId) -> bool {
        self.state.read().states.id_exists(id)
    }

    pub fn state_exists(&self, id: &IdentityId, state: &FieldElement) -> bool {
        self.state.read().states.state_exists(id, state)
    }

    pub fn get_state_info_by_id(&self, id: &IdentityId) -> Result<StateInfo, RegistryError> {
        Ok(self.state.read().states.get_state_info_by_id(id)?)
    }

    pub fn get_state_info_by_id_and_state(
        &self,
        id: &IdentityId,
        state: &FieldElement,
    ) -> Result<StateInfo, RegistryError> {
        Ok(self.state.read().states.get_state_info_by_id_and_state(id, state)?)
    }

    pub fn get_state_info_history_length_by_id(&self, id: &IdentityId) -> Result<usize, RegistryError> {
        Ok(self.state.read().states.get_state_info_history_length_by_id(id)?)
    }

    pub fn get_state_info_history_by_id(
        &self,
        id: &IdentityId,
        start: usize,
        length: usize,
    ) -> Result<Vec<StateInfo>, RegistryError> {
        Ok(self
            .state
            .read()
            .states
            .get_state_info_history_by_id(id, start, length)?)
    }

    pub fn get_gist_root(&self) -> FieldElement {
        self.state.read().states.get_gist_root()
    }

    pub fn get_gist_proof(&self, id: &IdentityId) -> Result<SmtProof, RegistryError> {
        Ok(self.state.read().states.get_gist_proof(id)?)
    }

    pub fn get_gist_proof_by_root(
        &self,
        id: &IdentityId,
        root: &FieldElement,
    ) -> Result<SmtProof, RegistryError> {
        Ok(self.state.read().states.get_gist_proof_by_root(id, root)?)
    }

    pub fn get_gist_proof_by_time(&self, id: &IdentityId, timestamp: u64) -> Result<SmtProof, RegistryError> {
        Ok(self.state.read().states.get_gist_proof_by_time(id, timestamp)?)
    }

    pub fn get_gist_proof_by_block(&self, id: &IdentityId, block: u64) -> Result<SmtProof, RegistryError> {
        Ok(self.state.read().states.get_gist_proof_by_block(id, block)?)
    }

    pub fn get_gist_root_history_length(&self) -> usize {
        self.state.read().states.get_gist_root_history_length()
    }

    pub fn get_gist_root_history(
        &self,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, RegistryError> {
        Ok(self.state.read().states.get_gist_root_history(start, length)?)
    }

    pub fn get_gist_root_info(&self, root: &FieldElement) -> Result<RootTransitionEntry, RegistryError> {
        Ok(self.state.read().states.get_gist_root_info(root)?)
    }

    pub fn get_gist_root_info_by_time(&self, timestamp: u64) -> Option<RootTransitionEntry> {
        self.state.read().states.get_gist_root_info_by_time(timestamp)
    }

    pub fn get_gist_root_info_by_block(&self, block: u64) -> Option<RootTransitionEntry> {
        self.state.read().states.get_gist_root_info_by_block(block)
    }

    pub fn get_gist_root_info_list_by_root(
        &self,
        root: &FieldElement,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, RegistryError> {
        Ok(self
            .state
            .read()
            .states
            .get_gist_root_info_list_by_root(root, start, length)?)
    }

    pub fn get_gist_root_info_list_length_by_root(&self, root: &FieldElement) -> usize {
        self.state
            .read()
            .states
            .get_gist_root_info_list_length_by_root(root)
    }

    // ─── Requests and whitelist ──────────────────────────────────────

    pub fn add_validator_to_whitelist(
        &self,
        caller: Address,
        id: ValidatorId,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.add_validator_to_whitelist(caller, id, verifier))
    }

    pub fn remove_validator_from_whitelist(
        &self,
        caller: Address,
        id: &ValidatorId,
    ) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.remove_validator_from_whitelist(caller, id))
    }

    pub fn is_whitelisted_validator(&self, id: &ValidatorId) -> bool {
        self.state
            .read()
            .verification
            .registry()
            .is_whitelisted_validator(id)
    }

    pub fn set_request(
        &self,
        caller: Address,
        request_id: RequestId,
        definition: RequestDefinition,
    ) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.set_request(caller, request_id, definition))
    }

    pub fn disable_request(&self, caller: Address, request_id: RequestId) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.disable_request(caller, request_id))
    }

    pub fn enable_request(&self, caller: Address, request_id: RequestId) -> Result<(), RegistryError> {
        self.mutate(|s| s.verification.enable_request(caller, request_id))
    }

    pub fn get_request(&self, request_id: RequestId) -> Result<RequestDefinition, RegistryError> {
        Ok(self.state.read().verification.get_request(request_id)?)
    }

    pub fn get_request_full_info(&self, request_id: RequestId) -> Result<ProofRequest, RegistryError> {
        Ok(self.state.read().verification.get_request_full_info(request_id)?)
    }

    pub fn request_id_exists(&self, request_id: RequestId) -> bool {
        self.state
            .read()
            .verification
            .registry()
            .request_id_exists(request_id)
    }

    pub fn get_requests_count(&self) -> usize {
        self.state.read().verification.registry().get_requests_count()
    }

    pub fn get_requests_count_by_controller(&self, controller: &Address) -> usize {
        self.state
            .read()
            .verification
            .registry()
            .get_requests_count_by_controller(controller)
    }

    pub fn get_requests(&self, offset: usize, length: usize) -> Result<Vec<ProofRequest>, RegistryError> {
        Ok(self
            .state
            .read()
            .verification
            .registry()
            .get_requests(offset, length)?)
    }

    pub fn get_requests_by_controller(
        &self,
        controller: &Address,
        offset: usize,
        length: usize,
    ) -> Result<Vec<ProofRequest>, RegistryError> {
        Ok(self
            .state
            .read()
            .verification
            .registry()
            .get_requests_by_controller(controller, offset, length)?)
    }

    // ─── Proofs ──────────────────────────────────────────────────────

    pub fn submit_zkp_response(
        &self,
        ctx: BlockContext,
        requester: IdentityId,
        request_id: RequestId,
        public_inputs: &[FieldElement],
        proof: &ProofPayload,
    ) -> Result<VerifiedResponse, RegistryError> {
        self.mutate(|s| {
            s.verification
                .submit_zkp_response(ctx, requester, request_id, public_inputs, proof)
        })
    }

    pub fn verify_zkp_response(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        public_inputs: &[FieldElement],
        proof: &ProofPayload,
    ) -> Result<VerifiedResponse, RegistryError> {
        Ok(self
            .state
            .read()
            .verification
            .verify_zkp_response(requester, request_id, public_inputs, proof)?)
    }

    pub fn verify_linked_proofs(
        &self,
        requester: IdentityId,
        request_ids: &[RequestId],
    ) -> Result<(), RegistryError> {
        Ok(self
            .state
            .read()
            .verification
            .verify_linked_proofs(requester, request_ids)?)
    }

    pub fn add_storage_field_raw_value(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
        raw_value: Vec<u8>,
    ) -> Result<(), RegistryError> {
        self.mutate(|s| {
            s.verification
                .add_storage_field_raw_value(requester, request_id, field_name, raw_value)
        })
    }

    pub fn get_proof_status(&self, requester: IdentityId, request_id: RequestId) -> ProofStatus {
        self.state
            .read()
            .verification
            .get_proof_status(requester, request_id)
    }

    pub fn get_proof_storage_field(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
    ) -> Option<FieldElement> {
        self.state
            .read()
            .verification
            .get_proof_storage_field(requester, request_id, field_name)
    }

    pub fn get_proof_storage_raw_value(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
    ) -> Option<Vec<u8>> {
        self.state
            .read()
            .verification
            .get_proof_storage_raw_value(requester, request_id, field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryEventSink;
    use gist_core::ErrorKind;
    use gist_crypto::DEFAULT_MAX_DEPTH;
    use gist_state::{StateError, DEFAULT_ID_TYPE};
    use gist_verifier::RequestError;
    use gist_zkp::MockProofVerifier;

    const OWNER: Address = Address::repeat_byte(0x01);

    fn registry() -> (Registry, Arc<MemoryEventSink>) {
        let sink = Arc::new(MemoryEventSink::new());
        (Registry::with_sink(OWNER, sink.clone()), sink)
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn successful_transition_publishes_event() {
        let (reg, sink) = registry();
        let genesis = FieldElement::from(1u64);
        let id = reg.derive_id(&genesis);
        let root = reg
            .transit_state(BlockContext::new(100, 1), id, genesis, FieldElement::from(2u64), true)
            .unwrap();
        assert_eq!(reg.get_gist_root(), root);
        assert_eq!(
            sink.take(),
            vec![RegistryEvent::StateUpdated {
                id,
                block: 1,
                timestamp: 100,
                state: FieldElement::from(2u64),
            }]
        );
    }

    #[test]
    fn failed_mutation_publishes_nothing() {
        let (reg, sink) = registry();
        let err = reg
            .transit_state(
                BlockContext::new(100, 1),
                IdentityId::from(5),
                FieldElement::from(1u64),
                FieldElement::from(2u64),
                false,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(sink.is_empty());
        assert_eq!(reg.get_gist_root_history_length(), 0);
    }

    #[test]
    fn from_config_applies_limits() {
        let config = RegistryConfig {
            smt_max_depth: 16,
            default_id_type: [0x02, 0x12],
            ..RegistryConfig::default()
        };
        let reg = Registry::from_config(&config, OWNER, Arc::new(MemoryEventSink::new())).unwrap();
        assert_eq!(reg.gist_max_depth(), 16);
        assert_eq!(reg.default_id_type(), [0x02, 0x12]);
        assert!(reg.set_gist_max_depth(OWNER, 8).is_err());
        reg.set_gist_max_depth(OWNER, 32).unwrap();
        assert_eq!(reg.gist_max_depth(), 32);
    }

    #[test]
    fn admin_setters_are_owner_only() {
        let (reg, _sink) = registry();
        let stranger = Address::repeat_byte(0x77);

        let err = reg.set_gist_max_depth(stranger, 80).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(reg.gist_max_depth(), DEFAULT_MAX_DEPTH);

        let err = reg.set_default_id_type(stranger, [0x02, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Request(RequestError::Unauthorized { caller, .. }) if caller == stranger
        ));
        assert_eq!(reg.default_id_type(), DEFAULT_ID_TYPE);

        let verifier: Arc<dyn ProofVerifier> = Arc::new(MockProofVerifier::new("transition"));
        let err = reg.set_transition_verifier(stranger, Some(verifier.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        // Still unset: a proof-gated transition reports the missing verifier.
        let genesis = FieldElement::from(1u64);
        let err = reg
            .transit_state_with_proof(
                BlockContext::new(100, 1),
                reg.derive_id(&genesis),
                genesis,
                FieldElement::from(2u64),
                true,
                &Default::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::State(StateError::TransitionVerifierMissing)));

        reg.set_gist_max_depth(OWNER, 80).unwrap();
        reg.set_default_id_type(OWNER, [0x02, 0x00]).unwrap();
        reg.set_transition_verifier(OWNER, Some(verifier)).unwrap();
        assert_eq!(reg.gist_max_depth(), 80);
        assert_eq!(reg.default_id_type(), [0x02, 0x00]);
    }

    #[test]
    fn from_config_rejects_invalid() {
        let config = RegistryConfig {
            smt_max_depth: 0,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            Registry::from_config(&config, OWNER, Arc::new(MemoryEventSink::new())),
            Err(RegistryError::Config(_))
        ));
    }
}

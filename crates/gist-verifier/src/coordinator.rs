//! # Proof Verification Coordinator
//!
//! Runs submissions through the verifier a request references, records the
//! outcome as a [`ProofStatus`], and checks that linked proofs share one link
//! nonce.
//!
//! ## Submission Checks
//!
//! In order: the request exists, it is enabled, its validator is still
//! whitelisted, the public signals cover the verifier's layout, the
//! requester matches `userID` when the verifier binds them, and the verifier
//! accepts the proof. Nothing is written until every check has passed, and a
//! dry run ([`verify_zkp_response`](ProofVerificationCoordinator::verify_zkp_response))
//! never writes at all.
//!
//! ## Status Keys
//!
//! Statuses are keyed by the `userID` signal of the verified proof and the
//! request id, so the identity a proof is about owns its status regardless
//! of who relayed the submission.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use gist_core::{
    Address, BlockContext, EventJournal, FieldElement, IdentityId, RegistryEvent, RequestId,
    ValidatorId,
};
use gist_zkp::{ProofPayload, ProofVerifier, RequesterBinding, LINK_ID_FIELD, USER_ID_FIELD};

use crate::error::RequestError;
use crate::request::{ProofRequest, ProofRequestRegistry, RequestDefinition};
use crate::status::ProofStatus;

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedResponse {
    /// Identity the proof is about.
    pub user_id: IdentityId,
    pub validator_version: String,
    /// Named public signals.
    pub fields: BTreeMap<String, FieldElement>,
}

/// Request registry plus proof statuses.
#[derive(Debug)]
pub struct ProofVerificationCoordinator {
    registry: ProofRequestRegistry,
    statuses: HashMap<(IdentityId, RequestId), ProofStatus>,
    journal: EventJournal,
}

impl ProofVerificationCoordinator {
    pub fn new(registry: ProofRequestRegistry) -> Self {
        Self {
            registry,
            statuses: HashMap::new(),
            journal: EventJournal::new(),
        }
    }

    pub fn registry(&self) -> &ProofRequestRegistry {
        &self.registry
    }

    /// Events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.journal.drain()
    }

    // ─── Registry mutations ──────────────────────────────────────────

    pub fn set_request(
        &mut self,
        caller: Address,
        request_id: RequestId,
        definition: RequestDefinition,
    ) -> Result<(), RequestError> {
        let event = self.registry.set_request(caller, request_id, definition)?;
        self.journal.record(event);
        Ok(())
    }

    pub fn disable_request(&mut self, caller: Address, request_id: RequestId) -> Result<(), RequestError> {
        let event = self.registry.disable_request(caller, request_id)?;
        self.journal.record(event);
        Ok(())
    }

    pub fn enable_request(&mut self, caller: Address, request_id: RequestId) -> Result<(), RequestError> {
        let event = self.registry.enable_request(caller, request_id)?;
        self.journal.record(event);
        Ok(())
    }

    pub fn add_validator_to_whitelist(
        &mut self,
        caller: Address,
        id: ValidatorId,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Result<(), RequestError> {
        let event = self.registry.add_validator_to_whitelist(caller, id, verifier)?;
        self.journal.record(event);
        Ok(())
    }

    pub fn remove_validator_from_whitelist(
        &mut self,
        caller: Address,
        id: &ValidatorId,
    ) -> Result<(), RequestError> {
        let event = self.registry.remove_validator_from_whitelist(caller, id)?;
        self.journal.record(event);
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<(), RequestError> {
        self.registry.transfer_ownership(caller, new_owner)
    }

    // ─── Submission ──────────────────────────────────────────────────

    /// Verify a response and record its status.
    pub fn submit_zkp_response(
        &mut self,
        ctx: BlockContext,
        requester: IdentityId,
        request_id: RequestId,
        public_inputs: &[FieldElement],
        proof: &ProofPayload,
    ) -> Result<VerifiedResponse, RequestError> {
        let verified = self.check_response(requester, request_id, public_inputs, proof)?;

        let status = self
            .statuses
            .entry((verified.user_id, request_id))
            .or_default();
        status.is_proved = true;
        status.validator_version = verified.validator_version.clone();
        status.block = ctx.block;
        status.timestamp = ctx.timestamp;
        status.fields = verified.fields.clone();

        self.journal.record(RegistryEvent::ResponseSubmitted {
            request_id,
            caller: requester,
        });
        tracing::info!(
            request_id = %request_id,
            requester = %requester,
            user_id = %verified.user_id,
            block = ctx.block,
            "zkp response submitted"
        );
        Ok(verified)
    }

    /// The checks of [`submit_zkp_response`](Self::submit_zkp_response)
    /// without recording anything.
    pub fn verify_zkp_response(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        public_inputs: &[FieldElement],
        proof: &ProofPayload,
    ) -> Result<VerifiedResponse, RequestError> {
        self.check_response(requester, request_id, public_inputs, proof)
    }

    fn check_response(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        public_inputs: &[FieldElement],
        proof: &ProofPayload,
    ) -> Result<VerifiedResponse, RequestError> {
        let request = self.registry.get_request_full_info(request_id)?;
        if request.is_disabled {
            tracing::debug!(request_id = %request_id, "submission against disabled request");
            return Err(RequestError::RequestDisabled(request_id));
        }
        let verifier = self.registry.verifier(&request.validator)?;

        let fields = verifier.layout().extract(public_inputs)?;
        let user_id = fields
            .get(USER_ID_FIELD)
            .copied()
            .ok_or_else(|| RequestError::MissingSignal {
                validator: request.validator.clone(),
                field: USER_ID_FIELD,
            })?;
        if verifier.binding() == RequesterBinding::RequesterIsUser && user_id != requester.0 {
            tracing::warn!(request_id = %request_id, requester = %requester, "userID does not match requester");
            return Err(RequestError::UserIdMismatch { requester, user_id });
        }

        if !verifier.verify(public_inputs, proof, &request.params)? {
            tracing::warn!(request_id = %request_id, requester = %requester, "proof rejected by verifier");
            return Err(RequestError::ProofRejected(request_id));
        }

        Ok(VerifiedResponse {
            user_id: IdentityId(user_id),
            validator_version: verifier.version().to_string(),
            fields,
        })
    }

    // ─── Linked proofs ───────────────────────────────────────────────

    /// Check that `requester`'s proofs for `request_ids` share one non-zero
    /// `linkID`.
    pub fn verify_linked_proofs(
        &self,
        requester: IdentityId,
        request_ids: &[RequestId],
    ) -> Result<(), RequestError> {
        let (first, rest) = match request_ids {
            [first, rest @ ..] if !rest.is_empty() => (*first, rest),
            _ => return Err(RequestError::LinkedProofArity(request_ids.len())),
        };

        let link_id = self
            .get_proof_storage_field(requester, first, LINK_ID_FIELD)
            .filter(|v| !v.is_zero())
            .ok_or(RequestError::LinkIdNotFound(first))?;

        for other in rest {
            let other_link = self
                .get_proof_storage_field(requester, *other, LINK_ID_FIELD)
                .unwrap_or(FieldElement::ZERO);
            if other_link != link_id {
                return Err(RequestError::LinkedProofError {
                    request_id: first,
                    linked_request_id: *other,
                    request_link_id: link_id,
                    linked_request_link_id: other_link,
                });
            }
        }
        Ok(())
    }

    // ─── Side-channel storage ────────────────────────────────────────

    /// Attach an opaque value to an existing status. Last write wins.
    pub fn add_storage_field_raw_value(
        &mut self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
        raw_value: Vec<u8>,
    ) -> Result<(), RequestError> {
        let status = self
            .statuses
            .get_mut(&(requester, request_id))
            .ok_or(RequestError::ProofStatusNotFound {
                requester,
                request_id,
            })?;
        status
            .raw_values
            .insert(field_name.to_string(), raw_value.clone());
        self.journal.record(RegistryEvent::StorageFieldRawValueAdded {
            caller: requester,
            request_id,
            field_name: field_name.to_string(),
            raw_value,
        });
        tracing::debug!(request_id = %request_id, requester = %requester, field = field_name, "storage raw value added");
        Ok(())
    }

    // ─── Reads ───────────────────────────────────────────────────────

    /// Status for `requester` on `request_id`; unproved default when absent.
    pub fn get_proof_status(&self, requester: IdentityId, request_id: RequestId) -> ProofStatus {
        self.statuses
            .get(&(requester, request_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_proof_storage_field(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
    ) -> Option<FieldElement> {
        self.statuses
            .get(&(requester, request_id))
            .and_then(|s| s.field(field_name))
    }

    pub fn get_proof_storage_raw_value(
        &self,
        requester: IdentityId,
        request_id: RequestId,
        field_name: &str,
    ) -> Option<Vec<u8>> {
        self.statuses
            .get(&(requester, request_id))
            .and_then(|s| s.raw_value(field_name))
            .map(<[u8]>::to_vec)
    }

    pub fn get_request(&self, request_id: RequestId) -> Result<RequestDefinition, RequestError> {
        self.registry.get_request(request_id)
    }

    pub fn get_request_full_info(&self, request_id: RequestId) -> Result<ProofRequest, RequestError> {
        self.registry.get_request_full_info(request_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gist_zkp::{MockProofVerifier, SignalLayout, VerifyError};

    const OWNER: Address = Address::repeat_byte(0x01);
    const CONTROLLER: Address = Address::repeat_byte(0xc0);
    const STRANGER: Address = Address::repeat_byte(0x5e);

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn ctx() -> BlockContext {
        BlockContext::new(1_700_000_000, 42)
    }

    struct Fixture {
        coord: ProofVerificationCoordinator,
        unbound: Arc<MockProofVerifier>,
        linked: Arc<MockProofVerifier>,
    }

    /// Request 1 uses an unbound verifier, requests 2 and 3 a bound one
    /// with `linkID` at position 1.
    fn fixture() -> Fixture {
        let unbound = Arc::new(MockProofVerifier::new("2.0.0-mock"));
        let linked = Arc::new(MockProofVerifier::linked("3.0.0-mock"));
        let mut coord = ProofVerificationCoordinator::new(ProofRequestRegistry::new(OWNER));
        coord
            .add_validator_to_whitelist(OWNER, ValidatorId::new("v2"), unbound.clone())
            .unwrap();
        coord
            .add_validator_to_whitelist(OWNER, ValidatorId::new("v3"), linked.clone())
            .unwrap();
        for (id, validator) in [(1u64, "v2"), (2, "v3"), (3, "v3")] {
            coord
                .set_request(
                    CONTROLLER,
                    RequestId(id),
                    RequestDefinition {
                        metadata: format!("request {id}"),
                        validator: ValidatorId::new(validator),
                        params: vec![id as u8],
                    },
                )
                .unwrap();
        }
        coord.drain_events();
        Fixture {
            coord,
            unbound,
            linked,
        }
    }

    #[test]
    fn submit_records_status() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        let user = IdentityId::from(77);
        let signals = [user.0, fe(5)];
        let proof = unbound.prove(&signals, &[1]);

        coord
            .submit_zkp_response(ctx(), user, RequestId(1), &signals, &proof)
            .unwrap();

        let status = coord.get_proof_status(user, RequestId(1));
        assert!(status.is_proved);
        assert_eq!(status.validator_version, "2.0.0-mock");
        assert_eq!(status.block, 42);
        assert_eq!(status.timestamp, 1_700_000_000);
        assert_eq!(
            coord.get_proof_storage_field(user, RequestId(1), USER_ID_FIELD),
            Some(user.0)
        );
        assert_eq!(
            coord.drain_events(),
            vec![RegistryEvent::ResponseSubmitted {
                request_id: RequestId(1),
                caller: user
            }]
        );
    }

    #[test]
    fn unbound_status_lands_under_proven_identity() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        let relayer = IdentityId::from(1);
        let user = IdentityId::from(2);
        let signals = [user.0];
        let proof = unbound.prove(&signals, &[1]);
        coord
            .submit_zkp_response(ctx(), relayer, RequestId(1), &signals, &proof)
            .unwrap();
        assert!(coord.get_proof_status(user, RequestId(1)).is_proved);
        assert!(!coord.get_proof_status(relayer, RequestId(1)).is_proved);
    }

    #[test]
    fn unknown_status_is_unproved_default() {
        let Fixture { coord, .. } = fixture();
        let status = coord.get_proof_status(IdentityId::from(9), RequestId(1));
        assert_eq!(status, ProofStatus::default());
    }

    #[test]
    fn bad_proof_writes_nothing() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        let user = IdentityId::from(77);
        let proof = unbound.prove(&[user.0], &[99]);
        assert_eq!(
            coord.submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &proof),
            Err(RequestError::ProofRejected(RequestId(1)))
        );
        assert!(!coord.get_proof_status(user, RequestId(1)).is_proved);
        assert!(coord.drain_events().is_empty());
    }

    #[test]
    fn malformed_proof_surfaces_verifier_error() {
        let Fixture { mut coord, .. } = fixture();
        let user = IdentityId::from(77);
        assert!(matches!(
            coord.submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &ProofPayload(vec![0])),
            Err(RequestError::Verifier(VerifyError::MalformedProof(_)))
        ));
    }

    #[test]
    fn unknown_and_disabled_requests() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        let user = IdentityId::from(77);
        let proof = unbound.prove(&[user.0], &[1]);
        assert_eq!(
            coord.submit_zkp_response(ctx(), user, RequestId(50), &[user.0], &proof),
            Err(RequestError::RequestNotFound(RequestId(50)))
        );

        assert!(matches!(
            coord.disable_request(STRANGER, RequestId(1)),
            Err(RequestError::Unauthorized { .. })
        ));
        coord.disable_request(CONTROLLER, RequestId(1)).unwrap();
        assert_eq!(
            coord.submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &proof),
            Err(RequestError::RequestDisabled(RequestId(1)))
        );
        assert_eq!(
            coord.verify_zkp_response(user, RequestId(1), &[user.0], &proof),
            Err(RequestError::RequestDisabled(RequestId(1)))
        );
        assert!(!coord.get_proof_status(user, RequestId(1)).is_proved);

        coord.enable_request(OWNER, RequestId(1)).unwrap();
        coord
            .submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &proof)
            .unwrap();
    }

    #[test]
    fn removed_validator_blocks_submission() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        coord
            .remove_validator_from_whitelist(OWNER, &ValidatorId::new("v2"))
            .unwrap();
        let user = IdentityId::from(77);
        let proof = unbound.prove(&[user.0], &[1]);
        assert_eq!(
            coord.submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &proof),
            Err(RequestError::ValidatorNotWhitelisted(ValidatorId::new("v2")))
        );
    }

    #[test]
    fn bound_verifier_requires_matching_requester() {
        let Fixture {
            mut coord, linked, ..
        } = fixture();
        let user = IdentityId::from(77);
        let signals = [user.0, fe(1234)];
        let proof = linked.prove(&signals, &[2]);
        assert_eq!(
            coord.submit_zkp_response(ctx(), IdentityId::from(78), RequestId(2), &signals, &proof),
            Err(RequestError::UserIdMismatch {
                requester: IdentityId::from(78),
                user_id: user.0
            })
        );
        coord
            .submit_zkp_response(ctx(), user, RequestId(2), &signals, &proof)
            .unwrap();
        assert_eq!(
            coord.get_proof_status(user, RequestId(2)).validator_version,
            "3.0.0-mock"
        );
    }

    #[test]
    fn dry_run_persists_nothing() {
        let Fixture { coord, linked, .. } = fixture();
        let user = IdentityId::from(77);
        let signals = [user.0, fe(1234)];
        let proof = linked.prove(&signals, &[2]);
        let verified = coord
            .verify_zkp_response(user, RequestId(2), &signals, &proof)
            .unwrap();
        assert_eq!(verified.user_id, user);
        assert_eq!(verified.fields[LINK_ID_FIELD], fe(1234));
        assert!(!coord.get_proof_status(user, RequestId(2)).is_proved);
    }

    #[test]
    fn short_public_inputs_rejected() {
        let Fixture { coord, linked, .. } = fixture();
        let user = IdentityId::from(77);
        let proof = linked.prove(&[user.0], &[2]);
        assert_eq!(
            coord.verify_zkp_response(user, RequestId(2), &[user.0], &proof),
            Err(RequestError::Verifier(VerifyError::SignalCount {
                expected: 2,
                actual: 1
            }))
        );
    }

    #[test]
    fn layout_without_user_id_is_rejected() {
        let mut coord = ProofVerificationCoordinator::new(ProofRequestRegistry::new(OWNER));
        let verifier = Arc::new(MockProofVerifier::new("x").with_layout(SignalLayout::new()));
        coord
            .add_validator_to_whitelist(OWNER, ValidatorId::new("bare"), verifier.clone())
            .unwrap();
        coord
            .set_request(
                CONTROLLER,
                RequestId(1),
                RequestDefinition {
                    metadata: String::new(),
                    validator: ValidatorId::new("bare"),
                    params: vec![],
                },
            )
            .unwrap();
        let proof = verifier.prove(&[fe(1)], &[]);
        assert!(matches!(
            coord.verify_zkp_response(IdentityId::from(1), RequestId(1), &[fe(1)], &proof),
            Err(RequestError::MissingSignal { .. })
        ));
    }

    fn submit_linked(
        coord: &mut ProofVerificationCoordinator,
        verifier: &MockProofVerifier,
        user: IdentityId,
        request_id: u64,
        link: u64,
    ) {
        let signals = [user.0, fe(link)];
        let proof = verifier.prove(&signals, &[request_id as u8]);
        coord
            .submit_zkp_response(ctx(), user, RequestId(request_id), &signals, &proof)
            .unwrap();
    }

    #[test]
    fn linked_proofs_match() {
        let Fixture {
            mut coord, linked, ..
        } = fixture();
        let user = IdentityId::from(77);
        submit_linked(&mut coord, &linked, user, 2, 555);
        submit_linked(&mut coord, &linked, user, 3, 555);
        coord
            .verify_linked_proofs(user, &[RequestId(2), RequestId(3)])
            .unwrap();
    }

    #[test]
    fn linked_proofs_mismatch() {
        let Fixture {
            mut coord, linked, ..
        } = fixture();
        let user = IdentityId::from(77);
        submit_linked(&mut coord, &linked, user, 2, 555);
        submit_linked(&mut coord, &linked, user, 3, 556);
        assert_eq!(
            coord.verify_linked_proofs(user, &[RequestId(2), RequestId(3)]),
            Err(RequestError::LinkedProofError {
                request_id: RequestId(2),
                linked_request_id: RequestId(3),
                request_link_id: fe(555),
                linked_request_link_id: fe(556),
            })
        );
    }

    #[test]
    fn linked_proofs_arity_and_missing_link() {
        let Fixture { coord, .. } = fixture();
        let user = IdentityId::from(77);
        assert_eq!(
            coord.verify_linked_proofs(user, &[RequestId(2)]),
            Err(RequestError::LinkedProofArity(1))
        );
        assert_eq!(
            coord.verify_linked_proofs(user, &[]),
            Err(RequestError::LinkedProofArity(0))
        );
        assert_eq!(
            coord.verify_linked_proofs(user, &[RequestId(1), RequestId(2)]),
            Err(RequestError::LinkIdNotFound(RequestId(1)))
        );
    }

    #[test]
    fn raw_values_last_write_wins() {
        let Fixture {
            mut coord, unbound, ..
        } = fixture();
        let user = IdentityId::from(77);
        assert_eq!(
            coord.add_storage_field_raw_value(user, RequestId(1), "issuer", vec![1]),
            Err(RequestError::ProofStatusNotFound {
                requester: user,
                request_id: RequestId(1)
            })
        );

        let proof = unbound.prove(&[user.0], &[1]);
        coord
            .submit_zkp_response(ctx(), user, RequestId(1), &[user.0], &proof)
            .unwrap();
        coord
            .add_storage_field_raw_value(user, RequestId(1), "issuer", vec![1])
            .unwrap();
        coord
            .add_storage_field_raw_value(user, RequestId(1), "issuer", vec![2, 3])
            .unwrap();
        assert_eq!(
            coord.get_proof_storage_raw_value(user, RequestId(1), "issuer"),
            Some(vec![2, 3])
        );

        // Resubmission refreshes the status but keeps side-channel values.
        let later = BlockContext::new(1_700_000_100, 43);
        coord
            .submit_zkp_response(later, user, RequestId(1), &[user.0], &proof)
            .unwrap();
        let status = coord.get_proof_status(user, RequestId(1));
        assert_eq!(status.block, 43);
        assert_eq!(status.raw_value("issuer"), Some(&[2u8, 3][..]));

        let events = coord.drain_events();
        assert!(events.contains(&RegistryEvent::StorageFieldRawValueAdded {
            caller: user,
            request_id: RequestId(1),
            field_name: "issuer".to_string(),
            raw_value: vec![2, 3],
        }));
    }

    #[test]
    fn registry_events_are_journaled() {
        let mut coord = ProofVerificationCoordinator::new(ProofRequestRegistry::new(OWNER));
        coord
            .add_validator_to_whitelist(OWNER, ValidatorId::new("v"), Arc::new(MockProofVerifier::new("1")))
            .unwrap();
        coord
            .set_request(
                CONTROLLER,
                RequestId(1),
                RequestDefinition {
                    metadata: "m".into(),
                    validator: ValidatorId::new("v"),
                    params: vec![],
                },
            )
            .unwrap();
        coord.disable_request(OWNER, RequestId(1)).unwrap();
        let names: Vec<_> = coord.drain_events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["ValidatorWhitelisted", "RequestSet", "RequestDisabled"]);
        assert_eq!(coord.get_request_full_info(RequestId(1)).unwrap().controller, CONTROLLER);
    }
}

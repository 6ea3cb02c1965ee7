//! # Identity State Registry
//!
//! Binds each identity's latest state into the global sparse Merkle tree
//! (the GIST) and keeps two histories in step with it:
//!
//! - the per-identity state log ([`StateInfo`]), and
//! - the global [`RootHistoryIndex`].
//!
//! ## Transition Rules
//!
//! A transition `(id, old_state, new_state, is_old_state_genesis)`:
//!
//! 1. `id` and `new_state` are non-zero, and `new_state` was never a state of
//!    `id`.
//! 2. Genesis path: `id` is unknown and `old_state` is its genesis state. The
//!    genesis state is logged with zero timestamp and block.
//! 3. Otherwise: `id` is known, its latest state was not created in this
//!    block, and `old_state` equals that latest state.
//! 4. The GIST leaf `H(id)` is set to `new_state`, the new root is appended
//!    to root history, and the previous state entry is sealed.
//!
//! ## Atomicity
//!
//! Every rule, the history monotonicity check, and any transition proof are
//! checked before the first write. The tree write is itself staged, so a
//! failing transition leaves the tree, both histories, and the event journal
//! untouched.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gist_core::{BlockContext, EventJournal, FieldElement, IdentityId, RegistryEvent};
use gist_crypto::{HashEngine, Sha256FieldHasher, SmtProof, SparseMerkleTree};
use gist_zkp::{ProofPayload, ProofVerifier};

use crate::error::StateError;
use crate::genesis::{GenesisIdDeriver, IdentityIdDeriver};
use crate::history::{page, RootHistoryIndex, RootTransitionEntry};

/// Default identity type prefix for ids derived by this registry.
pub const DEFAULT_ID_TYPE: [u8; 2] = [0x01, 0x12];

/// One entry in an identity's state log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInfo {
    pub id: IdentityId,
    pub state: FieldElement,
    pub replaced_by_state: FieldElement,
    pub created_at_timestamp: u64,
    pub replaced_at_timestamp: u64,
    pub created_at_block: u64,
    pub replaced_at_block: u64,
}

impl StateInfo {
    fn open(id: IdentityId, state: FieldElement, timestamp: u64, block: u64) -> Self {
        Self {
            id,
            state,
            replaced_by_state: FieldElement::ZERO,
            created_at_timestamp: timestamp,
            replaced_at_timestamp: 0,
            created_at_block: block,
            replaced_at_block: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct IdentityStateLog {
    entries: Vec<StateInfo>,
    by_state: HashMap<FieldElement, usize>,
}

impl IdentityStateLog {
    fn push(&mut self, info: StateInfo) {
        if let Some(tail) = self.entries.last_mut() {
            tail.replaced_by_state = info.state;
            tail.replaced_at_timestamp = info.created_at_timestamp;
            tail.replaced_at_block = info.created_at_block;
        }
        self.by_state.insert(info.state, self.entries.len());
        self.entries.push(info);
    }

    fn latest(&self) -> Option<&StateInfo> {
        self.entries.last()
    }
}

/// Identity states bound into the global tree.
pub struct StateRegistry<H: HashEngine = Sha256FieldHasher> {
    gist: SparseMerkleTree<H>,
    history: RootHistoryIndex,
    identities: HashMap<IdentityId, IdentityStateLog>,
    deriver: Arc<dyn IdentityIdDeriver>,
    transition_verifier: Option<Arc<dyn ProofVerifier>>,
    default_id_type: [u8; 2],
    journal: EventJournal,
}

impl StateRegistry<Sha256FieldHasher> {
    pub fn new() -> Self {
        Self::with_parts(
            SparseMerkleTree::new(),
            RootHistoryIndex::new(),
            Arc::new(GenesisIdDeriver),
        )
    }
}

impl Default for StateRegistry<Sha256FieldHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HashEngine> std::fmt::Debug for StateRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateRegistry")
            .field("gist", &self.gist)
            .field("history_len", &self.history.len())
            .field("identities", &self.identities.len())
            .field("transition_verifier", &self.transition_verifier)
            .finish()
    }
}

impl<H: HashEngine> StateRegistry<H> {
    pub fn with_parts(
        gist: SparseMerkleTree<H>,
        history: RootHistoryIndex,
        deriver: Arc<dyn IdentityIdDeriver>,
    ) -> Self {
        Self {
            gist,
            history,
            identities: HashMap::new(),
            deriver,
            transition_verifier: None,
            default_id_type: DEFAULT_ID_TYPE,
            journal: EventJournal::new(),
        }
    }

    pub fn with_transition_verifier(mut self, verifier: Arc<dyn ProofVerifier>) -> Self {
        self.transition_verifier = Some(verifier);
        self
    }

    pub fn set_transition_verifier(&mut self, verifier: Option<Arc<dyn ProofVerifier>>) {
        self.transition_verifier = verifier;
    }

    pub fn default_id_type(&self) -> [u8; 2] {
        self.default_id_type
    }

    pub fn set_default_id_type(&mut self, id_type: [u8; 2]) {
        self.default_id_type = id_type;
    }

    /// Id for `genesis_state` under the default type prefix.
    pub fn derive_id(&self, genesis_state: &FieldElement) -> IdentityId {
        self.deriver.derive_id(self.default_id_type, genesis_state)
    }

    pub fn set_gist_max_depth(&mut self, depth: usize) -> Result<(), StateError> {
        Ok(self.gist.set_max_depth(depth)?)
    }

    pub fn gist(&self) -> &SparseMerkleTree<H> {
        &self.gist
    }

    pub fn history(&self) -> &RootHistoryIndex {
        &self.history
    }

    /// Events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.journal.drain()
    }

    /// GIST leaf index of `id`.
    pub fn gist_key(&self, id: &IdentityId) -> FieldElement {
        self.gist.hasher().hash(&[id.0])
    }

    // ─── Transitions ─────────────────────────────────────────────────

    /// Move `id` from `old_state` to `new_state`. Returns the new GIST root.
    pub fn transit_state(
        &mut self,
        ctx: BlockContext,
        id: IdentityId,
        old_state: FieldElement,
        new_state: FieldElement,
        is_old_state_genesis: bool,
    ) -> Result<FieldElement, StateError> {
        self.check_transition(ctx, id, old_state, new_state, is_old_state_genesis)?;
        self.history.check_append(ctx.timestamp, ctx.block)?;

        let key = self.gist_key(&id);
        let root = self.gist.add_or_update(key, new_state)?;
        self.history.append(root, ctx.timestamp, ctx.block)?;

        let log = self.identities.entry(id).or_default();
        if is_old_state_genesis {
            log.push(StateInfo::open(id, old_state, 0, 0));
        }
        log.push(StateInfo::open(id, new_state, ctx.timestamp, ctx.block));

        self.journal.record(RegistryEvent::StateUpdated {
            id,
            block: ctx.block,
            timestamp: ctx.timestamp,
            state: new_state,
        });
        tracing::info!(
            id = %id,
            state = %new_state,
            root = %root,
            block = ctx.block,
            genesis = is_old_state_genesis,
            "identity state transitioned"
        );
        Ok(root)
    }

    /// [`transit_state`](Self::transit_state) gated by a transition proof
    /// over public signals `[id, old_state, new_state, is_old_state_genesis]`.
    pub fn transit_state_with_proof(
        &mut self,
        ctx: BlockContext,
        id: IdentityId,
        old_state: FieldElement,
        new_state: FieldElement,
        is_old_state_genesis: bool,
        proof: &ProofPayload,
    ) -> Result<FieldElement, StateError> {
        let verifier = self
            .transition_verifier
            .as_ref()
            .ok_or(StateError::TransitionVerifierMissing)?;
        let signals = [
            id.0,
            old_state,
            new_state,
            FieldElement::from(u64::from(is_old_state_genesis)),
        ];
        if !verifier.verify(&signals, proof, &[])? {
            tracing::warn!(id = %id, "state transition proof rejected");
            return Err(StateError::InvalidTransitionProof);
        }
        self.transit_state(ctx, id, old_state, new_state, is_old_state_genesis)
    }

    fn check_transition(
        &self,
        ctx: BlockContext,
        id: IdentityId,
        old_state: FieldElement,
        new_state: FieldElement,
        is_old_state_genesis: bool,
    ) -> Result<(), StateError> {
        if id.is_zero() {
            return Err(StateError::ZeroId);
        }
        if new_state.is_zero() {
            return Err(StateError::ZeroState);
        }
        if self.state_exists(&id, &new_state) || (is_old_state_genesis && new_state == old_state) {
            return Err(StateError::StateAlreadyExists {
                id,
                state: new_state,
            });
        }

        if is_old_state_genesis {
            if self.id_exists(&id) {
                return Err(StateError::IdentityAlreadyExists(id));
            }
            if !self.deriver.is_genesis_state(&id, &old_state) {
                return Err(StateError::NotGenesisState {
                    id,
                    state: old_state,
                });
            }
            return Ok(());
        }

        let latest = self
            .identities
            .get(&id)
            .and_then(IdentityStateLog::latest)
            .ok_or(StateError::IdentityNotFound(id))?;
        if latest.created_at_block == ctx.block {
            return Err(StateError::SameBlockTransition {
                id,
                block: ctx.block,
            });
        }
        if latest.state != old_state {
            return Err(StateError::OldStateMismatch {
                id,
                expected: latest.state,
                actual: old_state,
            });
        }
        Ok(())
    }

    // ─── Identity queries ────────────────────────────────────────────

    pub fn id_exists(&self, id: &IdentityId) -> bool {
        self.identities.contains_key(id)
    }

    pub fn state_exists(&self, id: &IdentityId, state: &FieldElement) -> bool {
        self.identities
            .get(id)
            .is_some_and(|log| log.by_state.contains_key(state))
    }

    /// Latest state entry of `id`.
    pub fn get_state_info_by_id(&self, id: &IdentityId) -> Result<StateInfo, StateError> {
        self.log(id)?
            .latest()
            .copied()
            .ok_or(StateError::IdentityNotFound(*id))
    }

    pub fn get_state_info_by_id_and_state(
        &self,
        id: &IdentityId,
        state: &FieldElement,
    ) -> Result<StateInfo, StateError> {
        let log = self.log(id)?;
        log.by_state
            .get(state)
            .and_then(|pos| log.entries.get(*pos))
            .copied()
            .ok_or(StateError::StateNotFound { id: *id, state: *state })
    }

    pub fn get_state_info_history_length_by_id(&self, id: &IdentityId) -> Result<usize, StateError> {
        Ok(self.log(id)?.entries.len())
    }

    pub fn get_state_info_history_by_id(
        &self,
        id: &IdentityId,
        start: usize,
        length: usize,
    ) -> Result<Vec<StateInfo>, StateError> {
        let log = self.log(id)?;
        let range = page(start, length, log.entries.len(), self.history.return_limit())?;
        Ok(log.entries[range].to_vec())
    }

    fn log(&self, id: &IdentityId) -> Result<&IdentityStateLog, StateError> {
        self.identities
            .get(id)
            .ok_or(StateError::IdentityNotFound(*id))
    }

    // ─── GIST queries ────────────────────────────────────────────────

    pub fn get_gist_root(&self) -> FieldElement {
        self.gist.root()
    }

    pub fn get_gist_proof(&self, id: &IdentityId) -> Result<SmtProof, StateError> {
        Ok(self.gist.get_proof(&self.gist_key(id))?)
    }

    pub fn get_gist_proof_by_root(
        &self,
        id: &IdentityId,
        root: &FieldElement,
    ) -> Result<SmtProof, StateError> {
        Ok(self.gist.get_proof_by_root(&self.gist_key(id), root)?)
    }

    /// Proof against the root that was current at `timestamp`.
    pub fn get_gist_proof_by_time(
        &self,
        id: &IdentityId,
        timestamp: u64,
    ) -> Result<SmtProof, StateError> {
        let root = self.history.root_by_time(timestamp);
        self.get_gist_proof_by_root(id, &root)
    }

    /// Proof against the root that was current at `block`.
    pub fn get_gist_proof_by_block(&self, id: &IdentityId, block: u64) -> Result<SmtProof, StateError> {
        let root = self.history.root_by_block(block);
        self.get_gist_proof_by_root(id, &root)
    }

    pub fn get_gist_root_history_length(&self) -> usize {
        self.history.len()
    }

    pub fn get_gist_root_history(
        &self,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, StateError> {
        Ok(self.history.get_history(start, length)?)
    }

    pub fn get_gist_root_info(&self, root: &FieldElement) -> Result<RootTransitionEntry, StateError> {
        Ok(*self.history.root_info(root)?)
    }

    pub fn get_gist_root_info_by_time(&self, timestamp: u64) -> Option<RootTransitionEntry> {
        self.history.entry_by_time(timestamp).copied()
    }

    pub fn get_gist_root_info_by_block(&self, block: u64) -> Option<RootTransitionEntry> {
        self.history.entry_by_block(block).copied()
    }

    pub fn get_gist_root_info_list_by_root(
        &self,
        root: &FieldElement,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, StateError> {
        Ok(self.history.root_info_list_by_root(root, start, length)?)
    }

    pub fn get_gist_root_info_list_length_by_root(&self, root: &FieldElement) -> usize {
        self.history.root_info_list_length_by_root(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gist_crypto::SmtError;
    use gist_zkp::MockProofVerifier;

    use crate::error::HistoryError;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    fn ctx(block: u64) -> BlockContext {
        BlockContext::new(1_000 + block * 10, block)
    }

    /// Registry with one identity moved from genesis `100` to `101` at block 1.
    fn with_identity() -> (StateRegistry, IdentityId) {
        let mut reg = StateRegistry::new();
        let id = reg.derive_id(&fe(100));
        reg.transit_state(ctx(1), id, fe(100), fe(101), true).unwrap();
        (reg, id)
    }

    #[test]
    fn genesis_transition_records_both_states() {
        let (reg, id) = with_identity();
        assert!(reg.id_exists(&id));
        assert!(reg.state_exists(&id, &fe(100)));
        assert!(reg.state_exists(&id, &fe(101)));
        assert_eq!(reg.get_state_info_history_length_by_id(&id).unwrap(), 2);

        let genesis = reg.get_state_info_by_id_and_state(&id, &fe(100)).unwrap();
        assert_eq!(genesis.created_at_block, 0);
        assert_eq!(genesis.created_at_timestamp, 0);
        assert_eq!(genesis.replaced_by_state, fe(101));
        assert_eq!(genesis.replaced_at_block, 1);

        let latest = reg.get_state_info_by_id(&id).unwrap();
        assert_eq!(latest.state, fe(101));
        assert_eq!(latest.created_at_block, 1);
        assert!(latest.replaced_by_state.is_zero());
    }

    #[test]
    fn gist_leaf_holds_latest_state() {
        let (mut reg, id) = with_identity();
        reg.transit_state(ctx(2), id, fe(101), fe(102), false).unwrap();
        let proof = reg.get_gist_proof(&id).unwrap();
        assert!(proof.existence);
        assert_eq!(proof.value, fe(102));
        assert_eq!(proof.index, reg.gist_key(&id));
        assert_eq!(proof.root, reg.get_gist_root());
        assert!(proof.verify(reg.gist().hasher()));
    }

    #[test]
    fn root_history_counts_transitions() {
        let (mut reg, id) = with_identity();
        reg.transit_state(ctx(2), id, fe(101), fe(102), false).unwrap();
        assert_eq!(reg.get_gist_root_history_length(), 2);
        let history = reg.get_gist_root_history(0, 2).unwrap();
        assert_eq!(history[0].replaced_by_root, history[1].root);
        assert_eq!(history[1].root, reg.get_gist_root());
        assert_eq!(
            reg.get_gist_root_history(0, 3),
            Err(StateError::History(HistoryError::OutOfBounds {
                start: 0,
                length: 3,
                len: 2
            }))
        );
    }

    #[test]
    fn proofs_by_time_and_block() {
        let (mut reg, id) = with_identity();
        let first_root = reg.get_gist_root();
        reg.transit_state(ctx(5), id, fe(101), fe(102), false).unwrap();

        let at_block_3 = reg.get_gist_proof_by_block(&id, 3).unwrap();
        assert_eq!(at_block_3.root, first_root);
        assert_eq!(at_block_3.value, fe(101));

        let at_time = reg.get_gist_proof_by_time(&id, ctx(5).timestamp).unwrap();
        assert_eq!(at_time.value, fe(102));

        let before = reg.get_gist_proof_by_block(&id, 0).unwrap();
        assert!(before.root.is_zero());
        assert!(!before.existence);

        let info = reg.get_gist_root_info_by_block(3).unwrap();
        assert_eq!(info.root, first_root);
        assert_eq!(info.replaced_at_block, 5);
        assert!(reg.get_gist_root_info_by_time(0).is_none());
    }

    #[test]
    fn unknown_root_queries_fail() {
        let (reg, id) = with_identity();
        assert_eq!(
            reg.get_gist_proof_by_root(&id, &fe(7)),
            Err(StateError::Smt(SmtError::RootNotFound(fe(7))))
        );
        assert_eq!(
            reg.get_gist_root_info(&fe(7)),
            Err(StateError::History(HistoryError::RootNotExist(fe(7))))
        );
        let root = reg.get_gist_root();
        assert_eq!(reg.get_gist_root_info(&root).unwrap().created_at_block, 1);
        assert_eq!(reg.get_gist_root_info_list_length_by_root(&root), 1);
        assert_eq!(reg.get_gist_root_info_list_by_root(&root, 0, 1).unwrap().len(), 1);
    }

    #[test]
    fn zero_id_and_zero_state_rejected() {
        let mut reg = StateRegistry::new();
        assert_eq!(
            reg.transit_state(ctx(1), IdentityId(FieldElement::ZERO), fe(1), fe(2), true),
            Err(StateError::ZeroId)
        );
        let id = reg.derive_id(&fe(1));
        assert_eq!(
            reg.transit_state(ctx(1), id, fe(1), FieldElement::ZERO, true),
            Err(StateError::ZeroState)
        );
    }

    #[test]
    fn genesis_rules() {
        let (mut reg, id) = with_identity();
        assert_eq!(
            reg.transit_state(ctx(2), id, fe(100), fe(200), true),
            Err(StateError::IdentityAlreadyExists(id))
        );
        let other = reg.derive_id(&fe(300));
        assert_eq!(
            reg.transit_state(ctx(2), other, fe(301), fe(302), true),
            Err(StateError::NotGenesisState {
                id: other,
                state: fe(301)
            })
        );
        assert_eq!(
            reg.transit_state(ctx(2), other, fe(300), fe(300), true),
            Err(StateError::StateAlreadyExists {
                id: other,
                state: fe(300)
            })
        );
    }

    #[test]
    fn non_genesis_rules() {
        let (mut reg, id) = with_identity();
        let unknown = reg.derive_id(&fe(900));
        assert_eq!(
            reg.transit_state(ctx(2), unknown, fe(900), fe(901), false),
            Err(StateError::IdentityNotFound(unknown))
        );
        assert_eq!(
            reg.transit_state(ctx(1), id, fe(101), fe(102), false),
            Err(StateError::SameBlockTransition { id, block: 1 })
        );
        assert_eq!(
            reg.transit_state(ctx(2), id, fe(100), fe(102), false),
            Err(StateError::OldStateMismatch {
                id,
                expected: fe(101),
                actual: fe(100)
            })
        );
        assert_eq!(
            reg.transit_state(ctx(2), id, fe(101), fe(100), false),
            Err(StateError::StateAlreadyExists { id, state: fe(100) })
        );
    }

    #[test]
    fn failed_transition_changes_nothing() {
        let (mut reg, id) = with_identity();
        let root = reg.get_gist_root();
        reg.drain_events();

        // Earlier block than the history tail.
        let stale = BlockContext::new(0, 0);
        let other = reg.derive_id(&fe(500));
        assert!(matches!(
            reg.transit_state(stale, other, fe(500), fe(501), true),
            Err(StateError::History(HistoryError::NonMonotonic { .. }))
        ));
        assert!(reg
            .transit_state(ctx(1), id, fe(101), fe(102), false)
            .is_err());

        assert_eq!(reg.get_gist_root(), root);
        assert_eq!(reg.get_gist_root_history_length(), 1);
        assert!(!reg.id_exists(&other));
        assert_eq!(reg.get_state_info_history_length_by_id(&id).unwrap(), 2);
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn transition_emits_state_updated() {
        let (mut reg, id) = with_identity();
        let events = reg.drain_events();
        assert_eq!(
            events,
            vec![RegistryEvent::StateUpdated {
                id,
                block: 1,
                timestamp: ctx(1).timestamp,
                state: fe(101),
            }]
        );
    }

    #[test]
    fn state_history_paging() {
        let (mut reg, id) = with_identity();
        reg.transit_state(ctx(2), id, fe(101), fe(102), false).unwrap();
        let page = reg.get_state_info_history_by_id(&id, 1, 2).unwrap();
        assert_eq!(page[0].state, fe(101));
        assert_eq!(page[1].state, fe(102));
        assert!(reg.get_state_info_history_by_id(&id, 0, 0).is_err());
        let unknown = IdentityId::from(77);
        assert_eq!(
            reg.get_state_info_by_id(&unknown),
            Err(StateError::IdentityNotFound(unknown))
        );
    }

    #[test]
    fn transition_with_proof() {
        let verifier = Arc::new(MockProofVerifier::new("transition-mock"));
        let mut reg = StateRegistry::new().with_transition_verifier(verifier.clone());
        let id = reg.derive_id(&fe(10));
        let signals = [id.0, fe(10), fe(11), fe(1)];
        let good = verifier.prove(&signals, &[]);
        let bad = verifier.prove(&[id.0, fe(10), fe(12), fe(1)], &[]);

        assert_eq!(
            reg.transit_state_with_proof(ctx(1), id, fe(10), fe(11), true, &bad),
            Err(StateError::InvalidTransitionProof)
        );
        assert!(!reg.id_exists(&id));
        reg.transit_state_with_proof(ctx(1), id, fe(10), fe(11), true, &good)
            .unwrap();
        assert_eq!(reg.get_state_info_by_id(&id).unwrap().state, fe(11));
    }

    #[test]
    fn transition_with_proof_requires_verifier() {
        let mut reg = StateRegistry::new();
        let id = reg.derive_id(&fe(10));
        assert_eq!(
            reg.transit_state_with_proof(ctx(1), id, fe(10), fe(11), true, &ProofPayload::default()),
            Err(StateError::TransitionVerifierMissing)
        );
    }

    #[test]
    fn many_identities_share_one_tree() {
        let mut reg = StateRegistry::new();
        let mut ids = Vec::new();
        for i in 1..=20u64 {
            let id = reg.derive_id(&fe(i * 1000));
            reg.transit_state(ctx(i), id, fe(i * 1000), fe(i * 1000 + 1), true)
                .unwrap();
            ids.push((id, fe(i * 1000 + 1)));
        }
        for (id, state) in ids {
            let proof = reg.get_gist_proof(&id).unwrap();
            assert!(proof.existence);
            assert_eq!(proof.value, state);
            assert!(proof.verify(reg.gist().hasher()));
        }
        assert_eq!(reg.gist().leaf_count(), 20);
    }
}

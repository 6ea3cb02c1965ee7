//! Concurrent readers and writers against one shared [`Registry`].

use std::sync::Arc;
use std::thread;

use gist_core::{Address, BlockContext, FieldElement};
use gist_crypto::Sha256FieldHasher;
use gist_registry::{MemoryEventSink, Registry};
use proptest::prelude::*;

const OWNER: Address = Address::repeat_byte(0x01);

#[test]
fn writers_serialize_and_readers_see_consistent_roots() {
    let sink = Arc::new(MemoryEventSink::new());
    let reg = Arc::new(Registry::with_sink(OWNER, sink.clone()));

    // Each writer owns a disjoint set of identities. Blocks are handed out
    // under the registry lock, so they must come from one counter.
    let clock = Arc::new(parking_lot::Mutex::new(BlockContext::new(1_000, 1)));

    thread::scope(|scope| {
        for writer in 0..4u64 {
            let reg = Arc::clone(&reg);
            let clock = Arc::clone(&clock);
            scope.spawn(move || {
                for i in 0..10u64 {
                    let genesis = FieldElement::from(writer * 1_000 + i + 1);
                    let id = reg.derive_id(&genesis);
                    let mut clock = clock.lock();
                    reg.transit_state(*clock, id, genesis, FieldElement::from(u64::MAX - i), true)
                        .unwrap();
                    *clock = clock.advance(1, 12);
                }
            });
        }
        for _ in 0..4 {
            let reg = Arc::clone(&reg);
            scope.spawn(move || {
                for _ in 0..50 {
                    let root = reg.get_gist_root();
                    if !root.is_zero() {
                        assert!(reg.get_gist_root_info(&root).is_ok());
                    }
                }
            });
        }
    });

    assert_eq!(reg.get_gist_root_history_length(), 40);
    assert_eq!(sink.len(), 40);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every identity's current proof recomputes the current root, whatever
    /// order the identities were registered in.
    #[test]
    fn proofs_recompute_current_root(seeds in prop::collection::hash_set(1u64..1_000_000, 1..12)) {
        let reg = Registry::with_sink(OWNER, Arc::new(MemoryEventSink::new()));
        let mut ctx = BlockContext::new(1_000, 1);
        let mut ids = Vec::new();
        for seed in seeds {
            let genesis = FieldElement::from(seed);
            let id = reg.derive_id(&genesis);
            reg.transit_state(ctx, id, genesis, FieldElement::from(seed + 1), true).unwrap();
            ctx = ctx.advance(1, 12);
            ids.push((id, seed + 1));
        }
        let root = reg.get_gist_root();
        for (id, state) in ids {
            let proof = reg.get_gist_proof(&id).unwrap();
            prop_assert!(proof.existence);
            prop_assert_eq!(proof.value, FieldElement::from(state));
            prop_assert_eq!(proof.root, root);
            prop_assert!(proof.verify(&Sha256FieldHasher));
        }
    }
}

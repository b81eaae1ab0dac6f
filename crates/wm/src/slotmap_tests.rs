// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

type Map = Slotmap<u64, String>;

/// Assert the allocation succeeded and unwrap it without `unwrap`.
fn must_alloc(map: &mut Map) -> Handle {
    let h = map.alloc();
    assert!(h.is_some(), "slotmap refused an allocation");
    h.unwrap_or(Handle::INVALID)
}

#[test]
fn alloc_returns_zeroed_payloads() {
    let mut map: Map = Slotmap::with_capacity(8);
    let h = must_alloc(&mut map);
    assert_eq!(map.hot(h), Some(&0));
    assert_eq!(map.cold(h).map(String::as_str), Some(""));
    assert!(map.live(h));
}

#[test]
fn freed_handle_never_resolves_again() {
    let mut map: Map = Slotmap::with_capacity(8);
    let h = must_alloc(&mut map);
    map.free(h);
    assert!(!map.live(h));
    assert_eq!(map.hot(h), None);
    assert_eq!(map.cold(h), None);

    // Reusing the slot bumps the generation, so the stale handle still
    // resolves to nothing.
    let h2 = must_alloc(&mut map);
    assert_eq!(h2.index(), h.index());
    assert_ne!(h2, h);
    assert_eq!(map.hot(h), None);
    assert_eq!(map.hot(h2), Some(&0));
}

#[test]
fn free_is_idempotent() {
    let mut map: Map = Slotmap::with_capacity(8);
    let h = must_alloc(&mut map);
    map.free(h);
    map.free(h);
    map.free(Handle::INVALID);
    assert_eq!(map.len(), 0);
    // The slot is reusable exactly once.
    assert!(map.alloc().is_some());
    assert_eq!(map.len(), 1);
}

#[test]
fn capacity_is_a_hard_bound() {
    let mut map: Map = Slotmap::with_capacity(2);
    assert!(map.alloc().is_some());
    assert!(map.alloc().is_some());
    assert!(map.alloc().is_none());
}

#[test]
fn iteration_visits_in_index_order() {
    let mut map: Map = Slotmap::with_capacity(8);
    let handles: Vec<Handle> = (0..4).filter_map(|_| map.alloc()).collect();
    assert_eq!(handles.len(), 4);
    map.free(handles[1]);
    let seen: Vec<usize> = map.iter().map(|(h, _, _)| h.index()).collect();
    assert_eq!(seen, vec![0, 2, 3]);
}

#[test]
fn invalid_handle_is_distinct_from_all_allocations() {
    let mut map: Map = Slotmap::with_capacity(64);
    for _ in 0..64 {
        let h = must_alloc(&mut map);
        assert_ne!(h, Handle::INVALID);
        assert!(h.is_valid());
    }
}

#[test]
fn mutation_through_handles_lands_in_the_right_slot() {
    let mut map: Map = Slotmap::with_capacity(8);
    let a = must_alloc(&mut map);
    let b = must_alloc(&mut map);
    if let Some(hot) = map.hot_mut(a) {
        *hot = 11;
    }
    if let Some(cold) = map.cold_mut(b) {
        cold.push_str("beta");
    }
    assert_eq!(map.hot(a), Some(&11));
    assert_eq!(map.hot(b), Some(&0));
    assert_eq!(map.cold(b).map(String::as_str), Some("beta"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A handle freed once returns None from every lookup no matter how
        /// many allocations reuse its slot afterwards.
        #[test]
        fn stale_handles_stay_stale(reuses in 0usize..32) {
            let mut map: Map = Slotmap::with_capacity(64);
            let first = map.alloc();
            prop_assert!(first.is_some());
            let h = first.unwrap_or(Handle::INVALID);
            map.free(h);
            for _ in 0..reuses {
                if let Some(fresh) = map.alloc() {
                    prop_assert!(map.live(fresh));
                    map.free(fresh);
                }
            }
            prop_assert_eq!(map.hot(h), None);
            prop_assert_eq!(map.cold(h), None);
        }

        /// Random alloc/free interleavings keep len consistent with the
        /// set of live handles.
        #[test]
        fn len_matches_live_set(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut map: Map = Slotmap::with_capacity(64);
            let mut live: Vec<Handle> = Vec::new();
            for alloc in ops {
                if alloc {
                    if let Some(h) = map.alloc() {
                        live.push(h);
                    }
                } else if let Some(h) = live.pop() {
                    map.free(h);
                }
                prop_assert_eq!(map.len(), live.len());
                for h in &live {
                    prop_assert!(map.live(*h));
                }
            }
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A fixed capacity lock-free stack of slot indices.
//!
//! [`IndexStack`][IndexStack] hands out the indices `0..capacity` to any
//! number of threads and takes them back again, without locks. It's meant as
//! the free list of a slot allocator: keep your objects in an array of your
//! own, and use the stack to decide which thread gets which array element.
//!
//! # Usage
//!
//! A new stack starts out holding every index. [`pop()`][pop] checks out an
//! index, spinning until one is available, and [`try_pop()`][try_pop] makes
//! a single attempt, returning [`SlotIndex::NULL`][NULL] if the stack was
//! empty or it lost a race with another thread. [`push()`][push] gives an
//! index back.
//!
//! The stack doesn't know who owns which index, so it can't stop you from
//! pushing an index twice or pushing one you never popped, and either will
//! corrupt it. If you don't need to pass indices around by hand,
//! [`acquire()`][acquire] returns a [`Slot`][Slot] which pushes its index back
//! when it's dropped.
//!
//! # Implementation
//!
//! This is a Treiber stack where the nodes are the slots themselves. There's
//! a table with one entry per slot, holding the index of the slot below it
//! while it's on the stack, and the top of the stack is a single `u64`
//! holding the index of the top slot and a 32 bit version number, updated
//! with compare-and-swap. The version number is bumped by every successful
//! push or pop, which guards against the ABA problem, though only up to a
//! point: see the notes on [`IndexStack`][IndexStack].
//!
//! The crate won't compile on targets without lock-free 64-bit atomics.
//!
//! # Example
//!
//! ```rust
//! # use indexstack::IndexStack;
//! # use std::sync::Arc;
//! # use std::thread;
//! let stack = Arc::new(IndexStack::new(8).unwrap());
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let stack = stack.clone();
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 let index = stack.pop();
//!                 // ... use slot `index` of your own array here ...
//!                 stack.push(index);
//!             }
//!         })
//!     })
//!     .collect();
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//!
//! // One pop and one push per round trip.
//! assert_eq!(800, stack.counter());
//!
//! // Every index is back where it started. Draining pops them, so the
//! // counter moves on by one for each.
//! let mut stack = Arc::try_unwrap(stack).unwrap();
//! assert_eq!(8, stack.drain().count());
//! assert_eq!(808, stack.counter());
//! ```
//!
//! # Feature Flags
//!
//! There's one feature flag available, `stats`, which makes the stack count
//! how often its operations lose a race or find it empty, available through
//! [`IndexStack::stats()`][stats]. It costs a relaxed atomic increment in the
//! affected code paths, so it's off by default.
//!
//! [IndexStack]: struct.IndexStack.html
//! [pop]: struct.IndexStack.html#method.pop
//! [try_pop]: struct.IndexStack.html#method.try_pop
//! [push]: struct.IndexStack.html#method.push
//! [acquire]: struct.IndexStack.html#method.acquire
//! [stats]: struct.IndexStack.html#method.stats
//! [Slot]: struct.Slot.html
//! [NULL]: struct.SlotIndex.html#associatedconstant.NULL

#![deny(rust_2018_idioms, nonstandard_style, unsafe_code)]
#![warn(unreachable_pub, missing_docs, missing_debug_implementations)]

#[cfg(not(target_has_atomic = "64"))]
compile_error!("indexstack needs lock-free 64-bit atomics");

mod bundle;
mod counter;
mod error;
mod index;
mod slot;
mod stack;
mod sync;

pub use self::counter::Stats;
pub use self::error::Error;
pub use self::index::{RawIndex, SlotIndex};
pub use self::slot::Slot;
pub use self::stack::{Chain, Drain, IndexStack, MAX_CAPACITY};

#[cfg(all(test, not(loom)))]
mod test {
    use super::*;
    use proptest::prelude::*;
    use static_assertions::assert_impl_all;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    assert_impl_all!(IndexStack: Send, Sync);
    assert_impl_all!(SlotIndex: Send, Sync, Copy);
    assert_impl_all!(Slot<'static>: Send, Sync);

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn assert_permutation(stack: &mut IndexStack) {
        let capacity = stack.capacity();
        let drained: Vec<u32> = stack.drain().filter_map(|index| index.get()).collect();
        assert_eq!(capacity, drained.len(), "drained {:?}", drained);
        let unique: BTreeSet<u32> = drained.iter().cloned().collect();
        assert_eq!((0..capacity as u32).collect::<BTreeSet<_>>(), unique);
    }

    #[test]
    fn stress_round_trips() {
        init_logging();
        const CAPACITY: usize = 8;
        const THREADS: usize = 10;
        const ROUNDS: usize = 100;

        let stack = Arc::new(IndexStack::new(CAPACITY).unwrap());
        let go = Arc::new(AtomicBool::new(false));
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let stack = stack.clone();
                let go = go.clone();
                thread::spawn(move || {
                    while !go.load(Ordering::Acquire) {
                        thread::yield_now();
                    }
                    for _ in 0..ROUNDS {
                        let index = stack.pop();
                        thread::yield_now();
                        stack.push(index);
                        thread::yield_now();
                    }
                })
            })
            .collect();
        go.store(true, Ordering::Release);
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!((2 * THREADS * ROUNDS) as u32, stack.counter());
        let mut stack = Arc::try_unwrap(stack).unwrap();
        log::info!("stress test finished: {:?}, {}", stack, stack.stats());
        assert_permutation(&mut stack);
    }

    #[test]
    fn no_slot_is_held_twice() {
        const CAPACITY: usize = 4;
        const THREADS: usize = 8;
        const ROUNDS: usize = 2000;

        let stack = Arc::new(IndexStack::new(CAPACITY).unwrap());
        let held: Arc<Vec<AtomicBool>> =
            Arc::new((0..CAPACITY).map(|_| AtomicBool::new(false)).collect());
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let stack = stack.clone();
                let held = held.clone();
                let successes = successes.clone();
                let failures = failures.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..ROUNDS {
                        let index = stack.try_pop();
                        if !index.is_valid() {
                            failures.fetch_add(1, Ordering::Relaxed);
                            thread::yield_now();
                            continue;
                        }
                        let flag = &held[index.as_usize()];
                        assert!(
                            !flag.swap(true, Ordering::AcqRel),
                            "{} handed out twice",
                            index
                        );
                        thread::yield_now();
                        flag.store(false, Ordering::Release);
                        stack.push(index);
                        successes.fetch_add(2, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(
            successes.load(Ordering::Relaxed) as u32,
            stack.counter(),
            "every successful pop and push bumps the version exactly once"
        );
        #[cfg(feature = "stats")]
        {
            let stats = stack.stats();
            assert_eq!(
                failures.load(Ordering::Relaxed),
                stats.pop_retries + stats.pop_empty,
                "every failed try_pop is a lost race or an empty stack: {}",
                stats
            );
        }
        #[cfg(not(feature = "stats"))]
        assert_eq!(Stats::default(), stack.stats());
        let mut stack = Arc::try_unwrap(stack).unwrap();
        assert_permutation(&mut stack);
    }

    #[test]
    fn counter_never_goes_backwards() {
        let stack = Arc::new(IndexStack::new(3).unwrap());
        let done = Arc::new(AtomicBool::new(false));
        let watcher = {
            let stack = stack.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut last = stack.counter();
                while !done.load(Ordering::Acquire) {
                    let now = stack.counter();
                    assert!(now >= last, "counter went from {} to {}", last, now);
                    last = now;
                }
            })
        };
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let stack = stack.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let slot = stack.acquire_wait();
                        drop(slot);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        done.store(true, Ordering::Release);
        watcher.join().unwrap();
        assert_eq!(8000, stack.counter());
    }

    #[test]
    fn chain_stays_acyclic_under_contention() {
        const CAPACITY: usize = 16;
        let stack = Arc::new(IndexStack::new(CAPACITY).unwrap());
        let workers: Vec<_> = (0..6)
            .map(|_| {
                let stack = stack.clone();
                thread::spawn(move || {
                    let mut held = Vec::new();
                    for round in 0..500 {
                        if round % 3 == 2 {
                            if let Some(index) = held.pop() {
                                stack.push(index);
                            }
                        } else {
                            let index = stack.try_pop();
                            if index.is_valid() {
                                held.push(index);
                            }
                        }
                    }
                    for index in held {
                        stack.push(index);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut stack = Arc::try_unwrap(stack).unwrap();
        let chain: Vec<SlotIndex> = stack.chain().collect();
        let unique: BTreeSet<SlotIndex> = chain.iter().cloned().collect();
        assert_eq!(CAPACITY, chain.len());
        assert_eq!(CAPACITY, unique.len());
        assert!(chain.iter().all(|index| index.as_usize() < CAPACITY));
        assert_permutation(&mut stack);
    }

    #[derive(Debug, Clone)]
    enum Action {
        Pop,
        Push(usize),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![Just(Action::Pop), any::<usize>().prop_map(Action::Push)]
    }

    proptest! {
        #[test]
        fn any_pop_push_sequence_preserves_the_permutation(
            capacity in 1usize..64,
            actions in prop::collection::vec(action(), 0..256),
        ) {
            let mut stack = IndexStack::new(capacity).unwrap();
            let mut held: Vec<SlotIndex> = Vec::new();
            let mut model: Vec<SlotIndex> = (0..capacity as u32).rev().map(SlotIndex::new).collect();
            let mut version = 0u32;
            for action in actions {
                match action {
                    Action::Pop => {
                        let index = stack.try_pop();
                        prop_assert_eq!(model.pop().unwrap_or(SlotIndex::NULL), index);
                        if index.is_valid() {
                            held.push(index);
                            version += 1;
                        }
                    }
                    Action::Push(pick) => {
                        if !held.is_empty() {
                            let index = held.swap_remove(pick % held.len());
                            stack.push(index);
                            model.push(index);
                            version += 1;
                        }
                    }
                }
                prop_assert_eq!(version, stack.counter());
                prop_assert_eq!(model.last().cloned().unwrap_or(SlotIndex::NULL), stack.top());
            }
            let chain: Vec<SlotIndex> = stack.chain().collect();
            let expected: Vec<SlotIndex> = model.iter().rev().cloned().collect();
            prop_assert_eq!(expected, chain);
            for index in held {
                stack.push(index);
            }
            assert_permutation(&mut stack);
        }
    }
}

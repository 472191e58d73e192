// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::{Debug, Error as FmtError, Formatter};

use log::debug;

use crate::bundle::Bundle;
use crate::counter::{Counter, Counters, Stats};
use crate::index::{RawIndex, SlotIndex};
use crate::sync::{spin, AtomicU32, AtomicU64, Ordering};
use crate::Error;

/// The largest capacity an [`IndexStack`][IndexStack] can have.
///
/// Every valid index must be strictly below [`SlotIndex::NULL`][NULL].
///
/// [IndexStack]: struct.IndexStack.html
/// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
pub const MAX_CAPACITY: usize = RawIndex::MAX as usize - 1;

/// A fixed capacity lock-free stack of slot indices.
///
/// The stack hands out the indices `0..capacity` to any number of threads
/// and takes them back again, without locks. It's a Treiber stack whose nodes
/// are the slots themselves: each slot's entry in the slot table holds the
/// index of the slot below it, and the top of the stack is a single atomic
/// word holding the top index and a version number.
///
/// # Ownership of indices
///
/// The stack doesn't track who holds what. An index returned by
/// [`pop()`][pop] or [`try_pop()`][try_pop] belongs to the caller until it's
/// given back with [`push()`][push], and it must be given back exactly once.
/// Pushing an index twice or pushing an index you didn't pop corrupts the
/// stack, and the stack can't detect either. Pushing an index outside
/// `0..capacity` panics. If you'd rather not keep track yourself, use
/// [`acquire()`][acquire], which gives you a [`Slot`][Slot] that pushes
/// itself back when dropped.
///
/// # The ABA problem
///
/// A thread which loads the top, gets preempted, and then compares-and-swaps
/// could succeed against a top that was popped and pushed back in the
/// meantime, installing a stale `next` link. Every successful operation
/// bumps the version stored next to the top index, so the swap only succeeds
/// if nothing happened in between. The version is 32 bits wide and wraps, so
/// this reduces the risk rather than removing it: a thread stalled for
/// exactly a multiple of 2<sup>32</sup> operations, with the same index back
/// on top, would still get through.
///
/// # Examples
///
/// ```rust
/// # use indexstack::IndexStack;
/// let stack = IndexStack::new(3).unwrap();
/// let first = stack.pop();
/// let second = stack.pop();
/// assert_eq!(Some(0), first.get());
/// assert_eq!(Some(1), second.get());
/// stack.push(first);
/// assert_eq!(first, stack.top());
/// ```
///
/// [pop]: #method.pop
/// [try_pop]: #method.try_pop
/// [push]: #method.push
/// [acquire]: #method.acquire
/// [Slot]: struct.Slot.html
pub struct IndexStack {
    top: AtomicU64,
    next: Box<[AtomicU32]>,
    counters: Counters,
}

impl IndexStack {
    /// Construct a full stack holding every index in `0..capacity`.
    ///
    /// The indices are linked in ascending order, so they come out of the
    /// stack as `0, 1, 2, ...` until something gets pushed back.
    ///
    /// Fails with [`Error::InvalidCapacity`][InvalidCapacity] if `capacity`
    /// is zero or greater than [`MAX_CAPACITY`][MAX_CAPACITY].
    ///
    /// [InvalidCapacity]: enum.Error.html#variant.InvalidCapacity
    /// [MAX_CAPACITY]: constant.MAX_CAPACITY.html
    pub fn new(capacity: usize) -> Result<Self, Error> {
        Self::build(capacity, SlotIndex::new(0))
    }

    /// Construct an empty stack with room for `capacity` indices.
    ///
    /// It's up to you to seed it by pushing every index in `0..capacity`
    /// exactly once, which is the one situation where pushing an index you
    /// didn't pop is allowed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use indexstack::{IndexStack, SlotIndex};
    /// let stack = IndexStack::empty(2).unwrap();
    /// assert_eq!(SlotIndex::NULL, stack.try_pop());
    /// stack.push(SlotIndex::new(1));
    /// stack.push(SlotIndex::new(0));
    /// assert_eq!(Some(0), stack.pop().get());
    /// ```
    pub fn empty(capacity: usize) -> Result<Self, Error> {
        Self::build(capacity, SlotIndex::NULL)
    }

    fn build(capacity: usize, top: SlotIndex) -> Result<Self, Error> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(Error::InvalidCapacity {
                capacity,
                max: MAX_CAPACITY,
            });
        }
        // Bounded by MAX_CAPACITY above, so the casts can't truncate.
        let last = (capacity - 1) as RawIndex;
        let next = (0..=last)
            .map(|index| {
                let link = if index == last {
                    SlotIndex::NULL
                } else {
                    SlotIndex::new(index + 1)
                };
                AtomicU32::new(link.raw())
            })
            .collect();
        debug!("new index stack: capacity {}, top {}", capacity, top);
        Ok(Self {
            top: AtomicU64::new(Bundle::new(top, 0).into_raw()),
            next,
            counters: Default::default(),
        })
    }

    #[inline(always)]
    fn load_top(&self, ordering: Ordering) -> Bundle {
        Bundle::from_raw(self.top.load(ordering))
    }

    #[inline(always)]
    fn link(&self, index: SlotIndex) -> &AtomicU32 {
        &self.next[index.as_usize()]
    }

    /// Make one attempt at popping an index off the stack.
    ///
    /// Returns [`SlotIndex::NULL`][NULL] if the stack was empty, or if
    /// another thread changed the top of the stack while this attempt was in
    /// progress. It never retries; loop on it yourself, or use
    /// [`pop()`][pop], if you need a slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use indexstack::IndexStack;
    /// let stack = IndexStack::new(1).unwrap();
    /// let index = stack.try_pop();
    /// assert!(IndexStack::is_valid(index));
    /// assert!(!IndexStack::is_valid(stack.try_pop()));
    /// ```
    ///
    /// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
    /// [pop]: #method.pop
    pub fn try_pop(&self) -> SlotIndex {
        let current = self.load_top(Ordering::Acquire);
        let candidate = current.index();
        if !candidate.is_valid() {
            self.counters.pop_empty.inc();
            return SlotIndex::NULL;
        }
        // If another thread takes `candidate` before we swap, it may be
        // rewriting this link right now. The value we read is then garbage,
        // but the version will have moved and the swap below fails.
        let below = SlotIndex::new(self.link(candidate).load(Ordering::Relaxed));
        match self.top.compare_exchange(
            current.into_raw(),
            current.succeed(below).into_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => candidate,
            Err(_) => {
                self.counters.pop_retries.inc();
                SlotIndex::NULL
            }
        }
    }

    /// Pop an index off the stack, spinning until one is available.
    ///
    /// This never yields to the OS scheduler: if every index is checked out
    /// it busy waits until another thread pushes one back, which means it
    /// never returns if nobody does.
    pub fn pop(&self) -> SlotIndex {
        loop {
            let index = self.try_pop();
            if index.is_valid() {
                return index;
            }
            spin();
        }
    }

    /// Push an index back onto the stack.
    ///
    /// `index` must have been popped from this stack and not pushed back
    /// since (or, for a stack made with [`empty()`][empty], be a seed index
    /// pushed for the first time). Only the range is checked.
    ///
    /// This always succeeds, retrying for as long as it keeps losing races
    /// with other threads.
    ///
    /// [empty]: #method.empty
    pub fn push(&self, index: SlotIndex) {
        debug_assert!(
            index.as_usize() < self.capacity(),
            "pushed {:?} onto a stack of capacity {}",
            index,
            self.capacity()
        );
        let link = self.link(index);
        let mut current = self.load_top(Ordering::Relaxed);
        loop {
            // We own `index`, so nobody else writes this link until the swap
            // below publishes it.
            link.store(current.index().raw(), Ordering::Relaxed);
            match self.top.compare_exchange_weak(
                current.into_raw(),
                current.succeed(index).into_raw(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => {
                    self.counters.push_retries.inc();
                    current = Bundle::from_raw(actual);
                }
            }
            spin();
        }
    }

    /// The index currently on top of the stack, or
    /// [`SlotIndex::NULL`][NULL] if it's empty.
    ///
    /// This is a snapshot for diagnostics. By the time you look at it,
    /// another thread may already have popped it.
    ///
    /// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
    pub fn top(&self) -> SlotIndex {
        self.load_top(Ordering::Acquire).index()
    }

    /// The number of successful pops and pushes so far, wrapping at
    /// `u32::MAX`.
    ///
    /// This is the version number which guards the top of the stack against
    /// the ABA problem, and it never goes backwards other than by wrapping.
    pub fn counter(&self) -> u32 {
        self.load_top(Ordering::Acquire).version()
    }

    /// The number of slots the stack manages.
    pub fn capacity(&self) -> usize {
        self.next.len()
    }

    /// Test whether `index` refers to a slot, ie. isn't
    /// [`SlotIndex::NULL`][NULL].
    ///
    /// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
    pub fn is_valid(index: SlotIndex) -> bool {
        index.is_valid()
    }

    /// Get a snapshot of the contention counters.
    ///
    /// Without the `stats` feature flag, this is always all zeroes.
    pub fn stats(&self) -> Stats {
        self.counters.snapshot()
    }

    /// Pop every index currently on the stack.
    ///
    /// This needs exclusive access, so no other thread can be halfway
    /// through an operation while it runs, and it's guaranteed to see every
    /// index that's been pushed back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use indexstack::IndexStack;
    /// let mut stack = IndexStack::new(4).unwrap();
    /// let taken = stack.pop();
    /// let rest: Vec<u32> = stack.drain().filter_map(|index| index.get()).collect();
    /// assert_eq!(vec![1, 2, 3], rest);
    /// # stack.push(taken);
    /// ```
    pub fn drain(&mut self) -> Drain<'_> {
        Drain {
            stack: self,
            drained: 0,
        }
    }

    /// Walk the indices currently on the stack from the top down, without
    /// popping them.
    ///
    /// The walk stops after [`capacity()`][capacity] steps even if the links
    /// haven't reached the end of the chain, which can only happen if the
    /// stack has been corrupted by pushing an index twice.
    ///
    /// [capacity]: #method.capacity
    pub fn chain(&mut self) -> Chain<'_> {
        let current = self.top();
        let remaining = self.capacity();
        Chain {
            stack: self,
            current,
            remaining,
        }
    }

    /// Count the indices currently on the stack.
    pub fn len(&mut self) -> usize {
        self.chain().count()
    }

    /// Test whether every index is currently checked out.
    ///
    /// Like [`top()`][top], this is only a snapshot while other threads are
    /// using the stack.
    ///
    /// [top]: #method.top
    pub fn is_empty(&self) -> bool {
        !self.top().is_valid()
    }
}

impl Debug for IndexStack {
    /// Debug implementation for `IndexStack`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use indexstack::IndexStack;
    /// let stack = IndexStack::new(16).unwrap();
    /// assert_eq!(
    ///     "IndexStack[top 0, version 0, capacity 16]",
    ///     format!("{:?}", stack)
    /// );
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        let top = self.load_top(Ordering::Acquire);
        write!(
            f,
            "IndexStack[top {}, version {}, capacity {}]",
            top.index(),
            top.version(),
            self.capacity()
        )
    }
}

/// An iterator which pops every index off an [`IndexStack`][IndexStack].
///
/// Returned by [`IndexStack::drain()`][drain].
///
/// [IndexStack]: struct.IndexStack.html
/// [drain]: struct.IndexStack.html#method.drain
pub struct Drain<'a> {
    stack: &'a mut IndexStack,
    drained: usize,
}

impl<'a> Iterator for Drain<'a> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<Self::Item> {
        // With exclusive access try_pop can't lose a race, so NULL means empty.
        self.stack.try_pop().get().map(|raw| {
            self.drained += 1;
            SlotIndex::new(raw)
        })
    }
}

impl<'a> Drop for Drain<'a> {
    fn drop(&mut self) {
        debug!(
            "drained {} of {} slots ({})",
            self.drained,
            self.stack.capacity(),
            self.stack.stats()
        );
    }
}

impl<'a> Debug for Drain<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "Drain[{}]:{:?}", self.drained, self.stack)
    }
}

/// An iterator over the indices on an [`IndexStack`][IndexStack], top first.
///
/// Returned by [`IndexStack::chain()`][chain].
///
/// [IndexStack]: struct.IndexStack.html
/// [chain]: struct.IndexStack.html#method.chain
pub struct Chain<'a> {
    stack: &'a IndexStack,
    current: SlotIndex,
    remaining: usize,
}

impl<'a> Iterator for Chain<'a> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() || self.remaining == 0 {
            return None;
        }
        let index = self.current;
        self.remaining -= 1;
        self.current = SlotIndex::new(self.stack.link(index).load(Ordering::Relaxed));
        Some(index)
    }
}

impl<'a> Debug for Chain<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "Chain[at {}]:{:?}", self.current, self.stack)
    }
}

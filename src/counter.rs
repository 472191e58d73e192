// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::{Display, Error, Formatter};

#[cfg(feature = "stats")]
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) trait Counter: Default {
    fn inc(&self);
    fn count(&self) -> usize;
}

#[cfg(feature = "stats")]
impl Counter for AtomicUsize {
    #[inline(always)]
    fn inc(&self) {
        self.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn count(&self) -> usize {
        self.load(Ordering::Relaxed)
    }
}

/// A counter which counts nothing, used when the `stats` feature is off.
#[derive(Default, Debug)]
#[cfg_attr(feature = "stats", allow(dead_code))]
pub(crate) struct NoCounter;

impl Counter for NoCounter {
    #[inline(always)]
    fn inc(&self) {}

    #[inline(always)]
    fn count(&self) -> usize {
        0
    }
}

#[cfg(feature = "stats")]
pub(crate) type StatCounter = AtomicUsize;
#[cfg(not(feature = "stats"))]
pub(crate) type StatCounter = NoCounter;

#[derive(Default, Debug)]
pub(crate) struct Counters {
    pub(crate) pop_retries: StatCounter,
    pub(crate) pop_empty: StatCounter,
    pub(crate) push_retries: StatCounter,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            pop_retries: self.pop_retries.count(),
            pop_empty: self.pop_empty.count(),
            push_retries: self.push_retries.count(),
        }
    }
}

/// Contention counters for an [`IndexStack`][IndexStack].
///
/// These are only collected when the `stats` feature flag is enabled;
/// otherwise every field is always zero. Counters are updated with relaxed
/// ordering, so a snapshot taken while other threads are working is
/// approximate.
///
/// [IndexStack]: struct.IndexStack.html
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Stats {
    /// Times [`try_pop()`][try_pop] lost a race for the top slot.
    ///
    /// [try_pop]: struct.IndexStack.html#method.try_pop
    pub pop_retries: usize,
    /// Times [`try_pop()`][try_pop] found the stack empty.
    ///
    /// [try_pop]: struct.IndexStack.html#method.try_pop
    pub pop_empty: usize,
    /// Times [`push()`][push] lost a race and had to go around again.
    ///
    /// [push]: struct.IndexStack.html#method.push
    pub push_retries: usize,
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "pop retries {}, pop empty {}, push retries {}",
            self.pop_retries, self.pop_empty, self.push_retries
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_counter_stays_at_zero() {
        let counter = NoCounter::default();
        counter.inc();
        counter.inc();
        assert_eq!(0, counter.count());
    }

    #[cfg(feature = "stats")]
    #[test]
    fn counters_snapshot() {
        let counters = Counters::default();
        counters.pop_retries.inc();
        counters.push_retries.inc();
        counters.push_retries.inc();
        assert_eq!(
            Stats {
                pop_retries: 1,
                pop_empty: 0,
                push_retries: 2,
            },
            counters.snapshot()
        );
    }

    #[test]
    fn display() {
        let stats = Stats {
            pop_retries: 3,
            pop_empty: 1,
            push_retries: 4,
        };
        assert_eq!(
            "pop retries 3, pop empty 1, push retries 4",
            stats.to_string()
        );
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors from constructing an [`IndexStack`][IndexStack].
///
/// Running out of slots is not an error: [`try_pop()`][try_pop] reports it
/// with [`SlotIndex::NULL`][NULL].
///
/// [IndexStack]: struct.IndexStack.html
/// [try_pop]: struct.IndexStack.html#method.try_pop
/// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested capacity was zero, or so large that a slot index would
    /// collide with [`SlotIndex::NULL`][NULL].
    ///
    /// [NULL]: struct.SlotIndex.html#associatedconstant.NULL
    #[error("invalid capacity {capacity}, must be between 1 and {max}")]
    InvalidCapacity {
        /// The capacity that was asked for.
        capacity: usize,
        /// The largest capacity a stack supports.
        max: usize,
    },
}

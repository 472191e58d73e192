// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::{Debug, Display, Error, Formatter};

/// The raw integer type behind a [`SlotIndex`][SlotIndex].
///
/// [SlotIndex]: struct.SlotIndex.html
pub type RawIndex = u32;

/// A handle to one slot of an [`IndexStack`][IndexStack].
///
/// This is a plain integer with no ownership attached: whoever holds a valid
/// `SlotIndex` popped from a stack is responsible for pushing it back exactly
/// once. It's `Copy` so it can be passed between threads for free.
///
/// The reserved value [`SlotIndex::NULL`][NULL] means "no slot", and is what
/// [`IndexStack::try_pop()`][try_pop] returns when it fails.
///
/// # Examples
///
/// ```rust
/// # use indexstack::SlotIndex;
/// let index = SlotIndex::new(3);
/// assert!(index.is_valid());
/// assert_eq!(Some(3), index.get());
/// assert!(!SlotIndex::NULL.is_valid());
/// assert_eq!(None, SlotIndex::NULL.get());
/// ```
///
/// [IndexStack]: struct.IndexStack.html
/// [NULL]: #associatedconstant.NULL
/// [try_pop]: struct.IndexStack.html#method.try_pop
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(RawIndex);

impl SlotIndex {
    /// The sentinel index, meaning "no slot" and terminating the free chain.
    pub const NULL: SlotIndex = SlotIndex(RawIndex::MAX);

    /// Wrap a raw index. Passing `RawIndex::MAX` gives you
    /// [`SlotIndex::NULL`][NULL].
    ///
    /// [NULL]: #associatedconstant.NULL
    #[inline(always)]
    pub const fn new(raw: RawIndex) -> Self {
        SlotIndex(raw)
    }

    /// Test whether this is a real slot rather than `NULL`.
    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != RawIndex::MAX
    }

    /// Get the raw index, or `None` if this is `NULL`.
    #[inline(always)]
    pub fn get(self) -> Option<RawIndex> {
        if self.is_valid() {
            Some(self.0)
        } else {
            None
        }
    }

    /// Get the raw index including the sentinel value.
    #[inline(always)]
    pub const fn raw(self) -> RawIndex {
        self.0
    }

    /// The index as a `usize`, for indexing into your own slot arrays.
    ///
    /// For `NULL` this is `RawIndex::MAX as usize`, which will be out of
    /// bounds for any array the stack can manage.
    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for SlotIndex {
    fn default() -> Self {
        Self::NULL
    }
}

impl From<RawIndex> for SlotIndex {
    fn from(raw: RawIndex) -> Self {
        Self::new(raw)
    }
}

impl From<SlotIndex> for Option<RawIndex> {
    fn from(index: SlotIndex) -> Self {
        index.get()
    }
}

impl Debug for SlotIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        if self.is_valid() {
            write!(f, "SlotIndex({})", self.0)
        } else {
            write!(f, "SlotIndex(NULL)")
        }
    }
}

impl Display for SlotIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        if self.is_valid() {
            Display::fmt(&self.0, f)
        } else {
            f.write_str("null")
        }
    }
}

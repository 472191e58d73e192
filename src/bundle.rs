// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::index::{RawIndex, SlotIndex};

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// The stack's top descriptor: the top slot and a version number packed into
/// one `u64`, so that both are swapped by a single compare-and-swap.
///
/// The index lives in the low 32 bits and the version in the high 32 bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Bundle(u64);

impl Bundle {
    #[inline(always)]
    pub(crate) const fn new(index: SlotIndex, version: u32) -> Self {
        Bundle(((version as u64) << INDEX_BITS) | index.raw() as u64)
    }

    #[inline(always)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Bundle(raw)
    }

    #[inline(always)]
    pub(crate) const fn into_raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub(crate) const fn index(self) -> SlotIndex {
        SlotIndex::new((self.0 & INDEX_MASK) as RawIndex)
    }

    #[inline(always)]
    pub(crate) const fn version(self) -> u32 {
        (self.0 >> INDEX_BITS) as u32
    }

    /// The descriptor that should replace `self` when `index` becomes the new
    /// top. The version wraps at `u32::MAX`.
    #[inline(always)]
    pub(crate) const fn succeed(self, index: SlotIndex) -> Self {
        Bundle::new(index, self.version().wrapping_add(1))
    }
}

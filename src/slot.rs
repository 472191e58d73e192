// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::{Debug, Display, Error, Formatter};

use crate::{IndexStack, SlotIndex};

/// A slot index checked out of an [`IndexStack`][IndexStack], which is
/// pushed back onto the stack when dropped.
///
/// # Examples
///
/// ```rust
/// # use indexstack::IndexStack;
/// let stack = IndexStack::new(1).unwrap();
/// {
///     let slot = stack.acquire().unwrap();
///     assert_eq!(Some(0), slot.index().get());
///     assert!(stack.acquire().is_none());
/// } // `slot` is dropped here, and index 0 goes back on the stack.
/// assert!(stack.acquire().is_some());
/// ```
///
/// [IndexStack]: struct.IndexStack.html
pub struct Slot<'a> {
    stack: &'a IndexStack,
    index: SlotIndex,
}

impl IndexStack {
    /// Make one attempt at checking out a slot.
    ///
    /// This is [`try_pop()`][try_pop] wrapped in a [`Slot`][Slot], so `None`
    /// means either that the stack was empty or that another thread got in
    /// the way.
    ///
    /// [try_pop]: #method.try_pop
    /// [Slot]: struct.Slot.html
    pub fn acquire(&self) -> Option<Slot<'_>> {
        let index = self.try_pop();
        if index.is_valid() {
            Some(Slot { stack: self, index })
        } else {
            None
        }
    }

    /// Check out a slot, spinning until one is available.
    ///
    /// This is [`pop()`][pop] wrapped in a [`Slot`][Slot].
    ///
    /// [pop]: #method.pop
    /// [Slot]: struct.Slot.html
    pub fn acquire_wait(&self) -> Slot<'_> {
        Slot {
            stack: self,
            index: self.pop(),
        }
    }
}

impl<'a> Slot<'a> {
    /// Wrap an index you popped from `stack` yourself, so that it's pushed
    /// back when the `Slot` is dropped.
    ///
    /// `index` must be a valid index you currently own, with the same rules
    /// as for [`IndexStack::push()`][push].
    ///
    /// [push]: struct.IndexStack.html#method.push
    pub fn from_index(stack: &'a IndexStack, index: SlotIndex) -> Self {
        debug_assert!(index.is_valid());
        Slot { stack, index }
    }

    /// The index of the slot.
    #[inline(always)]
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// The stack the slot came from.
    pub fn stack(&self) -> &'a IndexStack {
        self.stack
    }

    /// Consume the `Slot` without pushing it back, and return its index.
    ///
    /// You're now responsible for pushing the index back yourself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use indexstack::{IndexStack, Slot};
    /// let stack = IndexStack::new(1).unwrap();
    /// let index = Slot::into_index(stack.acquire_wait());
    /// assert!(stack.acquire().is_none());
    /// stack.push(index);
    /// assert!(stack.acquire().is_some());
    /// ```
    pub fn into_index(slot: Slot<'a>) -> SlotIndex {
        let index = slot.index;
        std::mem::forget(slot);
        index
    }

    /// Test whether two slots are the same slot of the same stack.
    pub fn same(left: &Self, right: &Self) -> bool {
        std::ptr::eq(left.stack, right.stack) && left.index == right.index
    }
}

impl<'a> Drop for Slot<'a> {
    fn drop(&mut self) {
        self.stack.push(self.index);
    }
}

impl<'a> Display for Slot<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        Display::fmt(&self.index, f)
    }
}

impl<'a> Debug for Slot<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "Slot[{}]:{:p}", self.index, self.stack)
    }
}

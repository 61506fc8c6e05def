// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    fmt::Debug,
    mem::{needs_drop, transmute, MaybeUninit},
    ops::{Deref, DerefMut},
};

use bytemuck::{fill_zeroes, Zeroable};

use crate::allocators::LinearAllocator;

/// A fixed-capacity contiguous array type, allocated from a
/// [`LinearAllocator`].
///
/// Named like Vec since it's used similarly, but this type does *not* allocate
/// more memory as needed, see [`GrowableVec`](super::GrowableVec) for that.
/// Very cheap to create and push to, and the backing memory does not need to
/// be initialized until it's actually used. Since the memory is borrowed from
/// the allocator, the allocator can't be reset or restored to an earlier
/// checkpoint while the [`FixedVec`] is alive.
pub struct FixedVec<'a, T> {
    uninit_slice: &'a mut [MaybeUninit<T>],
    initialized_len: usize,
}

impl<T> FixedVec<'_, T> {
    /// Creates a new [`FixedVec`] with enough space for `capacity` elements of
    /// type `T`. Returns None if the allocator does not have enough free space.
    pub fn new<'a>(allocator: &'a LinearAllocator, capacity: usize) -> Option<FixedVec<'a, T>> {
        let uninit_slice: &'a mut [MaybeUninit<T>] =
            allocator.try_alloc_uninit_slice::<T>(capacity)?;
        Some(FixedVec {
            uninit_slice,
            initialized_len: 0,
        })
    }

    /// Appends the value to the back of the array. If there's no capacity left,
    /// returns the given value back wrapped in a [`Result::Err`].
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let i = self.initialized_len;
        let Some(uninit_at_i) = self.uninit_slice.get_mut(i) else {
            return Err(value);
        };
        // Values at and past `initialized_len` are never initialized, since
        // the array only grows until it's dropped.
        uninit_at_i.write(value);
        self.initialized_len = i + 1;
        Ok(())
    }
}

impl<T: Zeroable> FixedVec<'_, T> {
    /// Fills out the rest of the array's capacity with zeroed values.
    pub fn fill_with_zeroes(&mut self) {
        fill_zeroes(&mut self.uninit_slice[self.initialized_len..]);
        // Safety: everything up until `self.initialized_len` must've already
        // been initialized, and now the rest is zeroed, and zeroed memory is
        // valid for T (because it's Zeroable) => the whole slice is
        // initialized.
        self.initialized_len = self.uninit_slice.len();
    }
}

impl<T> Drop for FixedVec<'_, T> {
    fn drop(&mut self) {
        if needs_drop::<T>() {
            for initialized_value in &mut self.uninit_slice[..self.initialized_len] {
                // Safety: everything below `initialized_len` is initialized,
                // and the array is not used after this.
                unsafe { initialized_value.assume_init_drop() };
            }
        }
    }
}

impl<T> Deref for FixedVec<'_, T> {
    type Target = [T];

    fn deref<'a>(&'a self) -> &'a Self::Target {
        let initialized_slice = &self.uninit_slice[..self.initialized_len];
        // Safety: `MaybeUninit<T>` is identical to `T` except that it might be
        // uninitialized, and all values up to `self.initialized_len` are
        // initialized.
        unsafe { transmute::<&'a [MaybeUninit<T>], &'a [T]>(initialized_slice) }
    }
}

impl<T> DerefMut for FixedVec<'_, T> {
    fn deref_mut<'a>(&'a mut self) -> &'a mut Self::Target {
        let initialized_slice = &mut self.uninit_slice[..self.initialized_len];
        // Safety: `MaybeUninit<T>` is identical to `T` except that it might be
        // uninitialized, and all values up to `self.initialized_len` are
        // initialized.
        unsafe { transmute::<&'a mut [MaybeUninit<T>], &'a mut [T]>(initialized_slice) }
    }
}

impl<T: Debug> Debug for FixedVec<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let slice: &[T] = self;
        f.debug_list().entries(slice).finish()
    }
}

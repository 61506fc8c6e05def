// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{cell::Cell, ffi::c_void, fmt::Debug, mem::MaybeUninit, slice};

use platform::Platform;
use thiserror::Error;

/// A saved allocation frontier of a [`LinearAllocator`], created with
/// [`LinearAllocator::save`] and consumed by [`LinearAllocator::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// The amount of bytes that were allocated when this checkpoint was saved.
    pub fn offset(self) -> usize {
        self.0
    }
}

/// Errors from [`LinearAllocator::restore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    /// The checkpoint is past the current allocation frontier, i.e. it was
    /// saved after a checkpoint that has already been restored. Checkpoints
    /// must be restored in the reverse order they were saved in.
    #[error("checkpoint at {checkpoint} bytes is ahead of the allocation frontier at {allocated} bytes")]
    AheadOfFrontier {
        /// The offset of the rejected checkpoint.
        checkpoint: usize,
        /// The allocated byte count at the time of the restore.
        allocated: usize,
    },
}

/// A linear allocator with a constant capacity. Can allocate memory regions
/// with any size or alignment very fast, but individual allocations can't be
/// freed, all of the allocations made after a [`Checkpoint`] must be freed at
/// once.
///
/// The capacity never grows: growing would require moving the backing memory,
/// and the allocations dealt out are plain borrows into it. Allocations that
/// don't fit return `None`, so size the allocator for the peak usage.
pub struct LinearAllocator<'platform> {
    backing_mem_ptr: *mut c_void,
    backing_mem_size: usize,
    platform: &'platform dyn Platform,

    allocated: Cell<usize>,
}

impl Debug for LinearAllocator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinearAllocator")
            .field("backing_mem_ptr", &self.backing_mem_ptr)
            .field("backing_mem_size", &self.backing_mem_size)
            .field("allocated", &self.allocated)
            .finish_non_exhaustive()
    }
}

impl Drop for LinearAllocator<'_> {
    fn drop(&mut self) {
        self.reset();
        // Safety: reset "frees" everything, so we can be sure that there's no
        // pointers to the memory backed by this pointer anymore, so it's safe
        // to free. See further safety explanation in the reset implementation.
        unsafe {
            self.platform
                .free(self.backing_mem_ptr, self.backing_mem_size);
        }
    }
}

impl LinearAllocator<'_> {
    /// Creates a new [`LinearAllocator`] with `capacity` bytes of backing
    /// memory. Returns None if allocating the memory fails, or if `capacity`
    /// is zero or overflows `isize`.
    pub fn new(platform: &dyn Platform, capacity: usize) -> Option<LinearAllocator> {
        if capacity > isize::MAX as usize || capacity == 0 {
            // Practically never happens, but asserting this here helps avoid a
            // safety check later.
            return None;
        }

        let backing_mem_ptr = platform.malloc(capacity);
        if backing_mem_ptr.is_null() {
            return None;
        }

        Some(LinearAllocator {
            backing_mem_ptr,
            backing_mem_size: capacity,
            platform,

            allocated: Cell::new(0),
        })
    }

    /// Returns the amount of bytes currently allocated, i.e. the offset where
    /// the next allocation would start (before alignment).
    pub fn allocated(&self) -> usize {
        self.allocated.get()
    }

    /// Returns the total (free and allocated) amount of memory owned by this
    /// allocator, in bytes.
    pub fn total(&self) -> usize {
        self.backing_mem_size
    }

    /// Allocates memory for a slice of `MaybeUninit<T>`, leaving the contents
    /// of the slice uninitialized, returning None if there's not enough free
    /// memory.
    ///
    /// A failed allocation does not move the allocation frontier, so smaller
    /// allocations may still succeed afterwards.
    pub fn try_alloc_uninit_slice<'a, T>(&'a self, len: usize) -> Option<&'a mut [MaybeUninit<T>]> {
        // Safety:
        // - The computed offset does not overflow `isize`: any value stored in
        //   `self.allocated` is checked to be no larger than
        //   `self.backing_mem_size` which in turn is no larger than
        //   `isize::MAX`.
        // - `self.backing_mem_ptr` is a pointer to an allocated object (it's
        //   from a successful `malloc`), and `self.allocated` is checked to be
        //   less than the amount of memory we asked for before it's set. So the
        //   memory range between `self.backing_mem_ptr` and the result is
        //   within the bounds of the allocated object.
        let previously_allocated_ptr =
            unsafe { self.backing_mem_ptr.byte_add(self.allocated.get()) };

        // Figure out the properly aligned offset of the new allocation.
        let extra_offset_for_alignment = previously_allocated_ptr.align_offset(align_of::<T>());
        let offset_into_allocation = self
            .allocated
            .get()
            .checked_add(extra_offset_for_alignment)?;

        // Check that this allocation fits.
        let new_allocated = len
            .checked_mul(size_of::<T>())
            .and_then(|size| size.checked_add(offset_into_allocation))?;
        if new_allocated > self.backing_mem_size {
            return None;
        }

        // Advance the `allocated` offset by the size. Note that `allocated` is
        // in a Cell, which guarantees that nobody else is reading `allocated`
        // in between the `get()` above and the `set()` here. Also note that
        // this value only goes up while the allocator is immutably borrowed,
        // which ensures that allocations don't overlap. The reset and restore
        // functions do lower this, see the safety explanation in reset.
        self.allocated.set(new_allocated);

        // Safety: `offset_into_allocation` is no larger than `new_allocated`,
        // which is checked above to fit in the allocated object. See the
        // safety explanation of `previously_allocated_ptr` for the rest.
        let now_allocated_ptr = unsafe { self.backing_mem_ptr.byte_add(offset_into_allocation) };

        let uninit_t_ptr = now_allocated_ptr as *mut MaybeUninit<T>;

        // Safety:
        // - `uninit_t_ptr` is non-null and valid for both reads and writes
        //   (which in turn have to follow MaybeUninit semantics, so we're
        //   "passing the unsafety" to the user of the slice).
        //   - The entire memory range of the slice is contained within a single
        //     allocated object, the malloc'd area of memory from the
        //     constructor.
        //   - `uninit_ptr` is non-null and aligned regardless of slice length
        //     of the size of T.
        // - `uninit_ptr` does point to `len` consecutive properly initialized
        //   values of type `MaybeUninit<T>`, because uninitialized values are
        //   valid for the type.
        // - The memory referenced by this slice is not accessed through any
        //   other pointer for the duration of lifetime 'a, since this pointer
        //   is derived from `self.allocated`, which has been bumped past the
        //   bounds of this slice, and is not lowered until self is mutably
        //   borrowable again (i.e. after this slice has been dropped).
        // - `len * size_of::<MaybeUninit<T>>()` is not larger than
        //   `isize::MAX`, because it is not larger than `self.backing_mem_size`
        //   as checked above, and that in turn is checked to be no larger than
        //   `isize::MAX` in the constructor.
        let uninit_t_slice: &'a mut [MaybeUninit<T>] =
            unsafe { slice::from_raw_parts_mut(uninit_t_ptr, len) };

        Some(uninit_t_slice)
    }

    /// Allocates a slice and copies `source` into it. Returns None if there's
    /// not enough free memory.
    pub fn try_alloc_slice_copy<'a, T: Copy>(&'a self, source: &[T]) -> Option<&'a mut [T]> {
        let uninit_slice = self.try_alloc_uninit_slice::<T>(source.len())?;
        for (dst, src) in uninit_slice.iter_mut().zip(source) {
            dst.write(*src);
        }
        let ptr = uninit_slice.as_mut_ptr() as *mut T;
        // Safety: every element of `uninit_slice` was written to above, so the
        // whole slice is initialized, and `MaybeUninit<T>` has the same layout
        // as `T`. The borrow is moved into the returned slice.
        Some(unsafe { slice::from_raw_parts_mut(ptr, source.len()) })
    }

    /// Returns the current allocation frontier, which can be passed to
    /// [`LinearAllocator::restore`] to free everything allocated after this
    /// call.
    pub fn save(&self) -> Checkpoint {
        Checkpoint(self.allocated.get())
    }

    /// Frees every allocation made after `checkpoint` was saved. The memory is
    /// not cleared, only the allocation frontier is moved back.
    ///
    /// Returns an error without changing anything if the checkpoint is ahead
    /// of the current frontier, which means checkpoints have been restored out
    /// of order.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let allocated = self.allocated.get();
        if checkpoint.0 > allocated {
            return Err(CheckpointError::AheadOfFrontier {
                checkpoint: checkpoint.0,
                allocated,
            });
        }
        // Safety: same reasoning as in reset. The mutable borrow of self
        // guarantees that no allocation borrowed from this allocator exists
        // anymore, including the ones past `checkpoint`.
        self.allocated.set(checkpoint.0);
        Ok(())
    }

    /// Resets the linear allocator, reclaiming all of the backing memory for
    /// future allocations.
    pub fn reset(&mut self) {
        // Safety: though this is not an unsafe operation, pretty much all the
        // unsafety in this file relies on `self.backing_mem_ptr +
        // self.allocated` to not point into memory which is already being
        // borrowed. Here's why we're not: We have a mutable borrow of self. =>
        // There's no other borrows of self. => There's no pointers to the
        // backing memory. (All previous allocations have lifetimes that cannot
        // outlive the related immutable borrow of this allocator.)
        self.allocated = Cell::new(0);
    }
}

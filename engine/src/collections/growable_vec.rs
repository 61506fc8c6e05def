// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    fmt::Debug,
    mem::needs_drop,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use platform::Platform;

/// The ratio of the new capacity to the old one when a [`GrowableVec`] runs
/// out of space.
const GROWTH_FACTOR: usize = 2;

/// A contiguous growable array type backed by [`Platform::malloc`].
///
/// Unlike [`FixedVec`](super::FixedVec), this one reallocates when it's full:
/// the capacity is doubled, the elements are moved over, and the old memory is
/// freed. So any pointer into the array is invalidated by a
/// [`GrowableVec::push`] that grows the array. The borrow checker enforces this
/// for references, as pushing requires a mutable borrow.
pub struct GrowableVec<'platform, T> {
    /// Dangling if `capacity * size_of::<T>() == 0`, otherwise points to memory
    /// from `platform.malloc` with space for `capacity` `T`s.
    ptr: NonNull<T>,
    capacity: usize,
    /// Invariant: the first `len` values behind `ptr` are initialized.
    len: usize,
    platform: &'platform dyn Platform,
}

impl<'platform, T> GrowableVec<'platform, T> {
    /// Creates a new [`GrowableVec`] with space for `capacity` elements before
    /// the first reallocation. Returns None if the memory can't be allocated.
    pub fn new(platform: &'platform dyn Platform, capacity: usize) -> Option<GrowableVec<'platform, T>> {
        let ptr = allocate::<T>(platform, capacity)?;
        Some(GrowableVec {
            ptr,
            capacity,
            len: 0,
            platform,
        })
    }

    /// Returns the amount of elements that fit in the array before it needs to
    /// be reallocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends the value to the back of the array, doubling the capacity first
    /// if the array is full. If the reallocation fails, returns the given value
    /// back wrapped in a [`Result::Err`], as it does when the doubled capacity
    /// would overflow.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == self.capacity {
            let Some(new_capacity) = self.capacity.checked_mul(GROWTH_FACTOR) else {
                return Err(value);
            };
            if self.grow(new_capacity.max(1)).is_none() {
                return Err(value);
            }
        }

        // Safety: `self.len < self.capacity` after the growth above, so the
        // pointer is within the allocation, and the value there is
        // uninitialized due to the invariant on `self.len`, so nothing gets
        // leaked by overwriting it.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;

        Ok(())
    }

    /// If non-empty, returns the final element and shortens the array by one.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: the value at the old `len - 1` was initialized, and since
        // `self.len` has been decremented, it won't be read again as if it
        // were initialized.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Empties out the array, dropping the contained values but keeping the
    /// backing memory around for reuse.
    pub fn reset(&mut self) {
        let initialized: *mut [T] = &mut **self;
        // Set the length first, so a panicking drop can't cause a double drop.
        self.len = 0;
        if needs_drop::<T>() {
            // Safety: `initialized` covers exactly the values which were
            // initialized, and they're not considered initialized anymore.
            unsafe { ptr::drop_in_place(initialized) };
        }
    }

    /// Empties out the array and frees the backing memory. The array can still
    /// be pushed to afterwards, which allocates again.
    pub fn release(&mut self) {
        self.reset();
        // Safety: `self.ptr` was allocated with this capacity by `allocate`,
        // and it's replaced by a dangling pointer right after.
        unsafe { deallocate(self.platform, self.ptr, self.capacity) };
        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }

    fn grow(&mut self, new_capacity: usize) -> Option<()> {
        let new_ptr = allocate::<T>(self.platform, new_capacity)?;
        // Safety: both allocations are valid for `self.len` values (since
        // `self.len <= self.capacity < new_capacity`) and they're distinct
        // allocations, so they don't overlap. The moved values are considered
        // uninitialized in the old allocation from here on, as it's freed.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            deallocate(self.platform, self.ptr, self.capacity);
        }
        self.ptr = new_ptr;
        self.capacity = new_capacity;
        Some(())
    }
}

impl<'platform, T: Copy> GrowableVec<'platform, T> {
    /// Creates a new [`GrowableVec`] containing a copy of `source`, with
    /// exactly enough capacity for it.
    pub fn from_slice(platform: &'platform dyn Platform, source: &[T]) -> Option<GrowableVec<'platform, T>> {
        let mut vec = GrowableVec::new(platform, source.len())?;
        // Safety: the allocation has space for `source.len()` values, and it
        // can't overlap with `source` since it was just allocated.
        unsafe { ptr::copy_nonoverlapping(source.as_ptr(), vec.ptr.as_ptr(), source.len()) };
        vec.len = source.len();
        Some(vec)
    }
}

impl<T> Drop for GrowableVec<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Deref for GrowableVec<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        // Safety: the first `self.len` values are initialized, and `self.ptr`
        // is non-null and aligned even when dangling.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for GrowableVec<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: see the Deref impl.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Debug> Debug for GrowableVec<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let slice: &[T] = self;
        f.debug_list().entries(slice).finish()
    }
}

fn allocate<T>(platform: &dyn Platform, capacity: usize) -> Option<NonNull<T>> {
    let size = capacity.checked_mul(size_of::<T>())?;
    if size > isize::MAX as usize {
        return None;
    }
    if size == 0 {
        return Some(NonNull::dangling());
    }
    let ptr = NonNull::new(platform.malloc(size) as *mut T)?;
    if !ptr.as_ptr().is_aligned() {
        // Safety: just allocated with this size, not used for anything.
        unsafe { platform.free(ptr.as_ptr().cast(), size) };
        return None;
    }
    Some(ptr)
}

/// ### Safety
///
/// `ptr` must have been returned by [`allocate`] with the same `platform` and
/// `capacity`, and must not be used afterwards.
unsafe fn deallocate<T>(platform: &dyn Platform, ptr: NonNull<T>, capacity: usize) {
    let size = capacity * size_of::<T>();
    if size > 0 {
        platform.free(ptr.as_ptr().cast(), size);
    }
}

#[cfg(test)]
mod tests {
    use core::{
        ptr::NonNull,
        sync::atomic::{AtomicI32, Ordering},
    };

    use crate::test_platform::TestPlatform;

    use super::GrowableVec;

    #[test]
    fn keeps_insertion_order_over_many_doublings() {
        let platform = TestPlatform::new();
        let mut vec = GrowableVec::<u32>::new(&platform, 3).unwrap();
        for i in 0..100 {
            vec.push(i).unwrap();
        }
        assert_eq!(100, vec.len());
        assert_eq!(192, vec.capacity());
        assert!(vec.iter().copied().eq(0..100));
    }

    #[test]
    fn grows_from_zero_capacity() {
        let platform = TestPlatform::new();
        let mut vec = GrowableVec::<u8>::new(&platform, 0).unwrap();
        vec.push(7).unwrap();
        vec.push(8).unwrap();
        assert_eq!(&[7, 8], &*vec);
        assert_eq!(2, vec.capacity());
    }

    #[test]
    fn push_fails_when_the_capacity_cannot_double() {
        let platform = TestPlatform::new();
        // Safety: any dangling pointer is a valid slice of zero-sized values.
        let units =
            unsafe { core::slice::from_raw_parts(NonNull::<()>::dangling().as_ptr(), usize::MAX) };
        let mut vec = GrowableVec::from_slice(&platform, units).unwrap();
        assert_eq!(usize::MAX, vec.capacity());
        assert_eq!(Err(()), vec.push(()));
        assert_eq!(usize::MAX, vec.len());
    }

    #[test]
    fn reset_keeps_the_memory_and_release_frees_it() {
        let platform = TestPlatform::new();
        let mut vec = GrowableVec::from_slice(&platform, &[1u64, 2, 3, 4]).unwrap();
        let ptr = vec.as_ptr();
        vec.reset();
        assert!(vec.is_empty());
        assert_eq!(4, vec.capacity());
        vec.push(5).unwrap();
        assert_eq!(ptr, vec.as_ptr());

        vec.release();
        assert_eq!(0, vec.capacity());
        assert_eq!(0, platform.live_heap_allocations());
        vec.push(6).unwrap();
        assert_eq!(&[6], &*vec);
    }

    #[test]
    fn does_not_leak() {
        static ELEMENT_COUNT: AtomicI32 = AtomicI32::new(0);

        struct Element;
        impl Element {
            fn create_and_count() -> Element {
                ELEMENT_COUNT.fetch_add(1, Ordering::Relaxed);
                Element
            }
        }
        impl Drop for Element {
            fn drop(&mut self) {
                ELEMENT_COUNT.fetch_add(-1, Ordering::Relaxed);
            }
        }

        let platform = TestPlatform::new();
        let mut vec = GrowableVec::new(&platform, 1).unwrap();
        for _ in 0..10 {
            assert!(vec.push(Element::create_and_count()).is_ok());
        }
        assert_eq!(10, ELEMENT_COUNT.load(Ordering::Relaxed));
        drop(vec.pop());
        assert_eq!(9, ELEMENT_COUNT.load(Ordering::Relaxed));
        vec.reset();
        assert_eq!(0, ELEMENT_COUNT.load(Ordering::Relaxed));
        for _ in 0..3 {
            assert!(vec.push(Element::create_and_count()).is_ok());
        }
        drop(vec);
        assert_eq!(0, ELEMENT_COUNT.load(Ordering::Relaxed));
        assert_eq!(0, platform.live_heap_allocations());
    }
}

// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use platform::Platform;

use crate::collections::GrowableStack;

use super::{Checkpoint, LinearAllocator};

/// A [`LinearAllocator`] for short-lived scratch allocations, with a stack of
/// saved checkpoints for nesting temporary scopes.
///
/// [`TempAllocator::push_state`] saves the current allocation frontier, and
/// [`TempAllocator::pop_state`] frees everything allocated since the matching
/// push. [`TempAllocator::scope`] wraps a closure in such a pair.
#[derive(Debug)]
pub struct TempAllocator<'platform> {
    arena: LinearAllocator<'platform>,
    checkpoints: GrowableStack<'platform, Checkpoint>,
}

impl<'platform> TempAllocator<'platform> {
    /// Creates a new [`TempAllocator`] with `capacity` bytes of scratch memory
    /// and room for `checkpoint_capacity` nested states before the checkpoint
    /// stack needs to grow. Returns None if allocating either fails.
    pub fn new(
        platform: &'platform dyn Platform,
        capacity: usize,
        checkpoint_capacity: usize,
    ) -> Option<TempAllocator<'platform>> {
        Some(TempAllocator {
            arena: LinearAllocator::new(platform, capacity)?,
            checkpoints: GrowableStack::new(platform, checkpoint_capacity)?,
        })
    }

    /// The scratch allocator. Allocations made from it live until the
    /// enclosing [`TempAllocator::pop_state`].
    pub fn arena(&self) -> &LinearAllocator<'platform> {
        &self.arena
    }

    /// The amount of currently pushed states.
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Saves the current allocation frontier.
    ///
    /// ### Panics
    ///
    /// If the checkpoint stack is full and can't grow.
    pub fn push_state(&mut self) {
        let checkpoint = self.arena.save();
        if self.checkpoints.push(checkpoint).is_err() {
            panic!("out of memory for temporary allocator checkpoints");
        }
    }

    /// Frees everything allocated since the matching
    /// [`TempAllocator::push_state`].
    ///
    /// ### Panics
    ///
    /// If there's no pushed state. Unbalanced push/pop calls would otherwise
    /// silently shift the allocation frontier for every later scope.
    pub fn pop_state(&mut self) {
        let Some(checkpoint) = self.checkpoints.pop() else {
            panic!("pop_state called without a matching push_state");
        };
        // The checkpoint stack is private and only ever pushed the current
        // frontier, and the frontier only moves down via pop_state, so the
        // checkpoint can't be ahead of it.
        if let Err(err) = self.arena.restore(checkpoint) {
            panic!("temporary allocator checkpoints out of order: {err}");
        }
    }

    /// Runs `f` between [`TempAllocator::push_state`] and
    /// [`TempAllocator::pop_state`], so everything `f` allocates from the
    /// arena is freed when it returns.
    pub fn scope<R>(&mut self, f: impl FnOnce(&LinearAllocator<'platform>) -> R) -> R {
        self.push_state();
        let result = f(&self.arena);
        self.pop_state();
        result
    }

    /// Frees every scratch allocation and forgets all pushed states.
    pub fn reset(&mut self) {
        self.checkpoints.reset();
        self.arena.reset();
    }
}

#[cfg(test)]
mod tests {
    use crate::test_platform::TestPlatform;

    use super::TempAllocator;

    #[test]
    fn balanced_pushes_and_pops_restore_the_frontier() {
        let platform = TestPlatform::new();
        let mut temp = TempAllocator::new(&platform, 1024, 1).unwrap();
        temp.arena().try_alloc_uninit_slice::<u8>(3).unwrap();
        let before = temp.arena().allocated();

        for depth in 0..20 {
            for _ in 0..depth {
                temp.push_state();
                temp.arena().try_alloc_uninit_slice::<u32>(2).unwrap();
            }
            for _ in 0..depth {
                temp.pop_state();
            }
            assert_eq!(before, temp.arena().allocated());
            assert_eq!(0, temp.depth());
        }
    }

    #[test]
    fn popped_memory_is_reused() {
        let platform = TestPlatform::new();
        let mut temp = TempAllocator::new(&platform, 1024, 4).unwrap();

        temp.push_state();
        let first = temp.arena().try_alloc_slice_copy(&[1u32; 8]).unwrap().as_ptr();
        temp.pop_state();

        temp.push_state();
        let second = temp.arena().try_alloc_slice_copy(&[2u32; 8]).unwrap().as_ptr();
        assert_eq!(first, second);
        temp.pop_state();
    }

    #[test]
    fn scope_frees_its_allocations() {
        let platform = TestPlatform::new();
        let mut temp = TempAllocator::new(&platform, 64, 4).unwrap();
        let sum = temp.scope(|arena| {
            let values = arena.try_alloc_slice_copy(&[1u8, 2, 3]).unwrap();
            values.iter().map(|&v| v as u32).sum::<u32>()
        });
        assert_eq!(6, sum);
        assert_eq!(0, temp.arena().allocated());
    }

    #[test]
    #[should_panic(expected = "without a matching push_state")]
    fn pop_without_push_panics() {
        let platform = TestPlatform::new();
        let mut temp = TempAllocator::new(&platform, 64, 4).unwrap();
        temp.pop_state();
    }
}

// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use platform::Platform;

use super::GrowableVec;

/// Unbounded LIFO stack of `T`, growing the same way as [`GrowableVec`].
#[derive(Debug)]
pub struct GrowableStack<'platform, T> {
    items: GrowableVec<'platform, T>,
}

impl<'platform, T> GrowableStack<'platform, T> {
    /// Creates a new stack with space for `capacity` items before the first
    /// reallocation. Returns None if the memory can't be allocated.
    pub fn new(platform: &'platform dyn Platform, capacity: usize) -> Option<GrowableStack<'platform, T>> {
        Some(GrowableStack {
            items: GrowableVec::new(platform, capacity)?,
        })
    }

    /// Pushes the value on top of the stack. If the stack is full and growing
    /// it fails, returns the value back wrapped in a [`Result::Err`].
    pub fn push(&mut self, value: T) -> Result<(), T> {
        self.items.push(value)
    }

    /// Removes and returns the topmost value, if any.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Returns the topmost value, if any.
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every value, keeping the backing memory.
    pub fn reset(&mut self) {
        self.items.reset();
    }
}

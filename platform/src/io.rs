// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

#[allow(unused_imports)] // used in docs
use crate::Platform;

/// Platform-specific file handle, returned by [`Platform::open_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Creates a new [`FileHandle`]. Should only be created in the platform
    /// implementation, which also knows how the inner value is going to be
    /// used.
    pub fn new(id: u64) -> FileHandle {
        FileHandle(id)
    }

    /// Returns the value passed into [`FileHandle::new`].
    pub fn inner(self) -> u64 {
        self.0
    }
}

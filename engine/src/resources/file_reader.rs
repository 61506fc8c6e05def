// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use platform::{FileHandle, Platform};
use thiserror::Error;

use crate::{allocators::LinearAllocator, collections::FixedVec};

/// The possible errors from [`read_file`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    #[error("the file could not be opened")]
    NotFound,
    #[error("the file is empty or its size is unknown")]
    Empty,
    #[error("not enough memory for a {size} byte file")]
    OutOfMemory { size: u64 },
    /// The underlying file reading operation failed.
    #[error("the platform failed to read the file")]
    Platform,
}

/// Reads the whole file at `path` into a buffer allocated from `arena`.
///
/// The file is closed before returning, whether the read succeeded or not.
pub fn read_file<'a>(
    platform: &dyn Platform,
    arena: &'a LinearAllocator,
    path: &str,
) -> Result<FixedVec<'a, u8>, ReadError> {
    let file = platform.open_file(path).ok_or(ReadError::NotFound)?;
    let result = read_opened_file(platform, arena, file);
    platform.close_file(file);
    result
}

fn read_opened_file<'a>(
    platform: &dyn Platform,
    arena: &'a LinearAllocator,
    file: FileHandle,
) -> Result<FixedVec<'a, u8>, ReadError> {
    let size = platform
        .file_size(file)
        .filter(|&size| size > 0)
        .ok_or(ReadError::Empty)?;
    let len = usize::try_from(size).map_err(|_| ReadError::OutOfMemory { size })?;
    let mut buffer = FixedVec::new(arena, len).ok_or(ReadError::OutOfMemory { size })?;
    buffer.fill_with_zeroes();
    if !platform.read_file(file, 0, &mut buffer) {
        return Err(ReadError::Platform);
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use crate::{allocators::LinearAllocator, test_platform::TestPlatform};

    use super::{read_file, ReadError};

    #[test]
    fn reads_whole_files_and_closes_them() {
        let platform = TestPlatform::new();
        platform.add_file("data/hello.txt", "hello");
        let arena = LinearAllocator::new(&platform, 64).unwrap();

        let bytes = read_file(&platform, &arena, "data/hello.txt").unwrap();
        assert_eq!(b"hello", &*bytes);
        assert_eq!(0, platform.open_file_count());
    }

    #[test]
    fn reports_missing_empty_and_oversized_files() {
        let platform = TestPlatform::new();
        platform.add_file("empty", "");
        platform.add_file("big", [0u8; 128]);
        let arena = LinearAllocator::new(&platform, 64).unwrap();

        assert_eq!(ReadError::NotFound, read_file(&platform, &arena, "missing").unwrap_err());
        assert_eq!(ReadError::Empty, read_file(&platform, &arena, "empty").unwrap_err());
        assert_eq!(
            ReadError::OutOfMemory { size: 128 },
            read_file(&platform, &arena, "big").unwrap_err(),
        );
        assert_eq!(0, platform.open_file_count());
        assert_eq!(0, arena.allocated());
    }
}

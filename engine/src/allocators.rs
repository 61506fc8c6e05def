// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod linear_allocator;
mod temp_allocator;

pub use linear_allocator::{Checkpoint, CheckpointError, LinearAllocator};
pub use temp_allocator::TempAllocator;

// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Asset loading and memory management on top of a [`platform::Platform`].
//!
//! The memory side is arena based: a [`allocators::LinearAllocator`] for
//! persistent data, a [`allocators::TempAllocator`] for scratch memory in
//! nested scopes, and collections allocated from either of those or from the
//! platform heap. [`resources::Resources`] uses them to load the assets
//! listed in an asset database file and hand out the resulting platform
//! handles by [`Sid`].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod allocators;
pub mod collections;
pub mod resources;
mod sid;

#[cfg(test)]
mod test_platform;

pub use sid::Sid;

// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::{
    fmt::{Debug, Display},
    num::NonZeroU32,
};

/// A 32-bit identifier naming an asset, usually a hash of a human-readable
/// name (see [`Sid::from_name`]). Zero is reserved for "no asset", so it's not
/// representable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid(NonZeroU32);

impl Sid {
    /// Wraps the raw identifier, or returns None for zero.
    pub const fn new(id: u32) -> Option<Sid> {
        match NonZeroU32::new(id) {
            Some(id) => Some(Sid(id)),
            None => None,
        }
    }

    /// Hashes a name into an identifier with djb2, plus one. This is the same
    /// hash the asset database tooling uses, e.g. `Sid::from_name("cube")`
    /// is `0x7c9557c5`.
    ///
    /// Returns a valid identifier for every name except the ones hashing to
    /// `u32::MAX`, which wrap to zero and are remapped to one.
    pub const fn from_name(name: &str) -> Sid {
        let bytes = name.as_bytes();
        let mut hash: u32 = 5381;
        let mut i = 0;
        while i < bytes.len() {
            hash = (hash << 5).wrapping_add(hash).wrapping_add(bytes[i] as u32);
            i += 1;
        }
        match Sid::new(hash.wrapping_add(1)) {
            Some(sid) => sid,
            None => Sid(NonZeroU32::MIN),
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for Sid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0.get())
    }
}

impl Debug for Sid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Sid({self})")
    }
}

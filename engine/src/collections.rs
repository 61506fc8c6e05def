// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod growable_stack;
mod growable_vec;
mod id_table;
mod vec;

pub use growable_stack::GrowableStack;
pub use growable_vec::GrowableVec;
pub use id_table::IdTable;
pub use vec::FixedVec;

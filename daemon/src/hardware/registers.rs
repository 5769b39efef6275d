// This file is part of pitayad, an application to configure FPGA control blocks through memory-mapped registers.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// pitayad is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// pitayad is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Word-aligned register offsets and the register access trait.

use crate::error::PitayadError;
use std::fmt;

/// A byte offset of a 32-bit register inside a register block.
///
/// Offsets are always word aligned. Building a misaligned offset is a programming error
/// and panics; in a `const` context that panic becomes a compile error, which is how the
/// addressing table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterOffset(u32);

impl RegisterOffset {
    pub const fn new(byte_offset: u32) -> Self {
        assert!(
            byte_offset % 4 == 0,
            "register offsets must be 32-bit word aligned"
        );
        RegisterOffset(byte_offset)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// First byte past this register.
    pub const fn end(self) -> usize {
        self.0 as usize + 4
    }

    /// Check that the whole register lies within a window of `len` bytes.
    pub fn check_bounds(self, len: usize) -> Result<(), PitayadError> {
        if self.end() > len {
            return Err(PitayadError::OutOfBounds {
                offset: self.0,
                len,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RegisterOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// 32-bit register access at word-aligned offsets.
///
/// Implementations must issue one bus transaction per call: no caching of reads and no
/// combining or reordering of writes.
pub trait RegisterBlock {
    /// Length of the accessible region in bytes.
    fn len(&self) -> usize;

    /// Read the register at `offset`.
    ///
    /// # Returns: `Result<u32, PitayadError>`
    /// * `Ok(u32)` - The raw register word
    /// * `Err(PitayadError::OutOfBounds)` - `offset + 4` exceeds [`RegisterBlock::len`]
    fn read32(&self, offset: RegisterOffset) -> Result<u32, PitayadError>;

    /// Write `value` to the register at `offset`.
    ///
    /// # Returns: `Result<(), PitayadError>`
    /// * `Ok(())` - The write was issued
    /// * `Err(PitayadError::OutOfBounds)` - `offset + 4` exceeds [`RegisterBlock::len`]
    fn write32(&mut self, offset: RegisterOffset, value: u32) -> Result<(), PitayadError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

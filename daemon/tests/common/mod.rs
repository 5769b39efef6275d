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

use pitayad::error::PitayadError;
use pitayad::hardware::registers::{RegisterBlock, RegisterOffset};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tempfile::TempDir;

/// In-memory register block that records every write in order.
#[derive(Debug, Default)]
pub struct RecordingBlock {
    memory: Vec<u32>,
    pub writes: Vec<(RegisterOffset, u32)>,
    /// Fail the write with this index (0-based) instead of performing it.
    pub fail_write_at: Option<usize>,
    /// Writes to this register are recorded but not stored, so it reads back stale.
    pub stuck_register: Option<RegisterOffset>,
}

impl RecordingBlock {
    pub fn new(len_bytes: usize) -> Self {
        RecordingBlock {
            memory: vec![0; len_bytes / 4],
            ..Default::default()
        }
    }

    pub fn word(&self, offset: u32) -> u32 {
        self.memory[offset as usize / 4]
    }

    pub fn write_offsets(&self) -> Vec<u32> {
        self.writes.iter().map(|(offset, _)| offset.get()).collect()
    }

    pub fn write_values(&self) -> Vec<u32> {
        self.writes.iter().map(|(_, value)| *value).collect()
    }
}

impl RegisterBlock for RecordingBlock {
    fn len(&self) -> usize {
        self.memory.len() * 4
    }

    fn read32(&self, offset: RegisterOffset) -> Result<u32, PitayadError> {
        offset.check_bounds(self.len())?;
        Ok(self.memory[offset.get() as usize / 4])
    }

    fn write32(&mut self, offset: RegisterOffset, value: u32) -> Result<(), PitayadError> {
        offset.check_bounds(self.len())?;
        if self.fail_write_at == Some(self.writes.len()) {
            return Err(PitayadError::Internal("injected write failure".into()));
        }
        self.writes.push((offset, value));
        if self.stuck_register != Some(offset) {
            self.memory[offset.get() as usize / 4] = value;
        }
        Ok(())
    }
}

/// A regular file standing in for the physical memory device.
pub struct ScratchMemory {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Create a zero-filled scratch memory file of `len` bytes.
pub fn scratch_memory(len: u64) -> ScratchMemory {
    let dir = tempfile::tempdir().expect("failed to create scratch dir");
    let path = dir.path().join("mem");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .expect("failed to create scratch memory file");
    file.set_len(len).expect("failed to size scratch memory file");
    ScratchMemory { _dir: dir, path }
}

/// Read the native-endian word at `offset` of a scratch memory file.
pub fn file_word(path: &std::path::Path, offset: usize) -> u32 {
    let bytes = std::fs::read(path).expect("failed to read scratch memory file");
    u32::from_ne_bytes(
        bytes[offset..offset + 4]
            .try_into()
            .expect("slice is four bytes"),
    )
}

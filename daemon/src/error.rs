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

use log::error;
use std::path::PathBuf;
use std::time::Duration;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum PitayadError {
    #[error("PitayadError::Map: Failed to map {len:#x} bytes at {base:#010x} through {path:?}: {e}")]
    Map {
        path: PathBuf,
        base: u64,
        len: usize,
        e: std::io::Error,
    },
    #[error("PitayadError::Unmap: Failed to unmap the window at {base:#010x}: {e}")]
    Unmap { base: u64, e: std::io::Error },
    #[error(
        "PitayadError::OutOfBounds: Register offset {offset:#x} does not fit in a window of {len:#x} bytes"
    )]
    OutOfBounds { offset: u32, len: usize },
    #[error("PitayadError::Range: {name} = {value} is outside the accepted range [-{limit}, {limit}]")]
    Range {
        name: String,
        value: i64,
        limit: i32,
    },
    #[error("PitayadError::UnknownChannel: {0}")]
    UnknownChannel(String),
    #[error("PitayadError::Timeout: Gave up waiting for {what} after {polls} polls ({elapsed:?})")]
    Timeout {
        what: &'static str,
        polls: u64,
        elapsed: Duration,
    },
    #[error("PitayadError::Acquisition: {0}")]
    Acquisition(String),
    #[error("PitayadError::Argument: {0}")]
    Argument(String),
    #[error("PitayadError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("PitayadError::IOWrite: An IO error occurred when writing to {file:?}: {e}")]
    IOWrite { file: PathBuf, e: std::io::Error },
    #[error("PitayadError::TomlDe: Failed to parse {file:?}: {e}")]
    TomlDe { file: PathBuf, e: toml::de::Error },
    #[error("PitayadError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl From<PitayadError> for fdo::Error {
    fn from(err: PitayadError) -> Self {
        error!("{err}");
        match err {
            PitayadError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            PitayadError::Range { .. } => fdo::Error::InvalidArgs(err.to_string()),
            PitayadError::UnknownChannel(..) => fdo::Error::InvalidArgs(err.to_string()),
            PitayadError::Map { .. } => fdo::Error::IOError(err.to_string()),
            PitayadError::Unmap { .. } => fdo::Error::IOError(err.to_string()),
            PitayadError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            PitayadError::IOWrite { .. } => fdo::Error::IOError(err.to_string()),
            PitayadError::Timeout { .. } => fdo::Error::TimedOut(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}

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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around standard file operations with trace logging and automatic
//! conversion to `PitayadError`. The daemon only touches ordinary files for its
//! configuration and for writing capture output; device memory goes through
//! [`crate::hardware::window`].
//!
//! # Examples
//!
//! ```rust,no_run
//! # use pitayad::system_io::{fs_read, fs_write};
//! # use std::path::Path;
//!
//! # fn example() -> Result<(), pitayad::error::PitayadError> {
//! let content = fs_read(Path::new("/etc/pitayad/config.toml"))?;
//! fs_write(Path::new("/tmp/acquisition_data.csv"), true, "0.000000000, 12\n")?;
//! # Ok(())
//! # }
//! ```

use crate::error::PitayadError;
use log::trace;
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, PitayadError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(PitayadError::IORead)` - If the file cannot be read
pub fn fs_read(file_path: &Path) -> Result<String, PitayadError> {
    trace!("Attempting to read from {file_path:?}");
    let mut buf: String = String::new();
    let result = OpenOptions::new()
        .read(true)
        .open(file_path)
        .and_then(|mut f| f.read_to_string(&mut buf));

    match result {
        Ok(_) => {
            trace!("Reading done");
            Ok(buf)
        }
        Err(e) => Err(PitayadError::IORead {
            file: file_path.into(),
            e,
        }),
    }
}

/// Write a string value to a file, replacing any previous content.
///
/// # Arguments
///
/// * `file_path` - Path to the file to write
/// * `create` - If `true`, create the file if it doesn't exist; if `false`, file must already exist
/// * `value` - The string value to write
///
/// # Returns: `Result<(), PitayadError>`
/// * `Ok(())` - Write succeeded
/// * `Err(PitayadError::IOWrite)` - If the write fails
pub fn fs_write(
    file_path: &Path,
    create: bool,
    value: impl AsRef<str>,
) -> Result<(), PitayadError> {
    trace!(
        "Attempting to write {} bytes to {:?}",
        value.as_ref().len(),
        file_path
    );
    let result = OpenOptions::new()
        .create(create)
        .write(true)
        .truncate(true)
        .open(file_path)
        .and_then(|mut f| f.write_all(value.as_ref().as_bytes()));
    match result {
        Ok(_) => {
            trace!("Write done.");
            Ok(())
        }
        Err(e) => Err(PitayadError::IOWrite {
            file: file_path.into(),
            e,
        }),
    }
}

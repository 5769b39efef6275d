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

pub mod control_interface;
pub mod status_interface;

use crate::acquisition::poller::PollTimeout;
use crate::channels::ChannelDescriptor;
use crate::error::PitayadError;
use crate::sequencer::SequenceReport;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bus callers pass a negative timeout to wait indefinitely.
pub fn poll_timeout_from_ms(timeout_ms: i64) -> PollTimeout {
    match u64::try_from(timeout_ms) {
        Ok(ms) => PollTimeout::After(Duration::from_millis(ms)),
        Err(_) => PollTimeout::Infinite,
    }
}

/// Resolve a caller's output path inside `output_dir`.
///
/// Relative paths are taken relative to `output_dir`. The parent directory is
/// canonicalised and must lie inside the canonical `output_dir`, so neither `..` nor a
/// symlinked directory can reach elsewhere. An existing symlink at the final path is
/// refused because the write would follow it. An empty path means the samples are only
/// counted, not written.
///
/// # Returns: `Result<Option<PathBuf>, PitayadError>`
/// * `Ok(None)` - No file was requested
/// * `Ok(Some(PathBuf))` - The canonical path to write
/// * `Err(PitayadError::Argument)` - The path escapes `output_dir`, names a directory or
///   a symlink, or its directory does not exist
pub(crate) fn validate_output_path(
    output_path: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>, PitayadError> {
    if output_path.is_empty() {
        return Ok(None);
    }
    let requested = output_dir.join(output_path);
    let dir = output_dir.canonicalize().map_err(|e| {
        PitayadError::Argument(format!(
            "the capture directory {output_dir:?} is not available: {e}"
        ))
    })?;
    let Some(file_name) = requested.file_name() else {
        return Err(PitayadError::Argument(format!(
            "output path {output_path:?} does not name a file"
        )));
    };
    let parent = requested
        .parent()
        .and_then(|parent| parent.canonicalize().ok())
        .ok_or_else(|| {
            PitayadError::Argument(format!(
                "the directory for output path {output_path:?} does not exist"
            ))
        })?;
    if !parent.starts_with(&dir) {
        return Err(PitayadError::Argument(format!(
            "output path {output_path:?} is outside the capture directory {output_dir:?}"
        )));
    }
    let path = parent.join(file_name);
    if let Ok(metadata) = path.symlink_metadata() {
        if metadata.is_dir() {
            return Err(PitayadError::Argument(format!(
                "output path {output_path:?} is a directory"
            )));
        }
        if metadata.file_type().is_symlink() {
            return Err(PitayadError::Argument(format!(
                "output path {output_path:?} is a symbolic link"
            )));
        }
    }
    Ok(Some(path))
}

/// Reply text for a completed register sequence.
pub(crate) fn report_message(action: &str, report: &SequenceReport) -> String {
    let mut message = format!("{action} ({} writes)", report.writes);
    for warning in &report.warnings {
        message.push_str(&format!("\nwarning: {warning}"));
    }
    message
}

/// One descriptor per line, `kind:tag: locations`.
pub(crate) fn channels_message(descriptors: &[ChannelDescriptor]) -> String {
    descriptors
        .iter()
        .map(|d| format!("{}:{}: {d}", d.kind(), d.tag()))
        .collect::<Vec<_>>()
        .join("\n")
}

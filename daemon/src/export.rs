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

//! CSV output of captured samples.
//!
//! One line per sample, `timestamp, value`, with the timestamp in seconds printed with nine
//! fractional digits:
//!
//! ```text
//! 0.000000000, -812
//! 0.000000008, -809
//! ```

use crate::error::PitayadError;
use crate::system_io::fs_write;
use log::info;
use std::fmt::Write;
use std::path::Path;

/// Seconds from the trigger to sample `index`.
pub fn sample_timestamp(index: usize, sample_rate_hz: f64, decimation: u32) -> f64 {
    index as f64 * (1.0 / sample_rate_hz) * f64::from(decimation)
}

/// Render `samples` as CSV text.
pub fn samples_to_csv(samples: &[i16], sample_rate_hz: f64, decimation: u32) -> String {
    let mut out = String::with_capacity(samples.len() * 20);
    for (i, value) in samples.iter().enumerate() {
        let timestamp = sample_timestamp(i, sample_rate_hz, decimation);
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{timestamp:.9}, {value}");
    }
    out
}

/// Write `samples` to `path` as CSV, replacing any existing file.
pub fn write_samples_csv(
    path: &Path,
    samples: &[i16],
    sample_rate_hz: f64,
    decimation: u32,
) -> Result<(), PitayadError> {
    fs_write(path, true, samples_to_csv(samples, sample_rate_hz, decimation))?;
    info!("wrote {} samples to {path:?}", samples.len());
    Ok(())
}

#[cfg(test)]
mod test_export {
    use crate::export::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::first(0, 1, 0.0)]
    #[case::one_tick(1, 1, 8e-9)]
    #[case::decimated(3, 8, 3.0 * 8.0 / 125e6)]
    fn timestamps(#[case] index: usize, #[case] decimation: u32, #[case] expected: f64) {
        expect_that!(
            sample_timestamp(index, 125e6, decimation),
            approx_eq(expected)
        );
    }

    #[gtest]
    fn csv_lines() {
        let text = samples_to_csv(&[-812, 0, 17], 125e6, 1);
        expect_that!(
            text,
            eq("0.000000000, -812\n0.000000008, 0\n0.000000016, 17\n")
        );
    }

    #[gtest]
    fn empty_capture_is_empty_file() {
        expect_that!(samples_to_csv(&[], 125e6, 1), eq(""));
    }

    #[gtest]
    fn writes_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("capture.csv");
        write_samples_csv(&path, &[5, 6], 125e6, 2)?;
        let text = std::fs::read_to_string(&path)?;
        expect_that!(text, eq("0.000000000, 5\n0.000000016, 6\n"));
        Ok(())
    }
}

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

use crate::common::{ScratchMemory, file_word, scratch_memory};
use googletest::prelude::*;
use pitayad::acquisition::poller::{PollPolicy, PollTimeout};
use pitayad::acquisition::simulated::SimulatedBackend;
use pitayad::acquisition::{CaptureSettings, InputChannel, TriggerSource};
use pitayad::channels::{AddressingTable, DacChannel};
use pitayad::config::{AcquisitionBackendKind, SystemConfig};
use pitayad::hardware::window::with_window;
use pitayad::operations;
use rstest::*;
use std::time::Duration;

const PID_BASE: u64 = 0x0000;
const DAC_BASE: u64 = 0x1000;
const TABLE: AddressingTable = AddressingTable::new(PID_BASE, DAC_BASE);

/// Config pointing both register blocks into a scratch file.
#[fixture]
fn scratch() -> (ScratchMemory, SystemConfig) {
    let mem = scratch_memory(0x2000);
    let config = SystemConfig {
        dev_mem_path: mem.path.clone(),
        pid_base_address: PID_BASE,
        dac_base_address: DAC_BASE,
        map_size: 0x1000,
        acquisition_backend: AcquisitionBackendKind::Simulated,
        poll_policy: PollPolicy::fixed(
            Duration::from_millis(1),
            PollTimeout::After(Duration::from_secs(5)),
        ),
        trigger_settle: Duration::ZERO,
        ..SystemConfig::default()
    };
    (mem, config)
}

#[gtest]
#[rstest]
fn configure_pid_lands_in_memory(scratch: (ScratchMemory, SystemConfig)) -> Result<()> {
    let (mem, config) = scratch;
    let report = operations::configure_pid(&config, &TABLE, "11", None, 100, -50, 0)?;
    expect_that!(report.writes, eq(6));
    expect_that!(report.warnings, is_empty());
    expect_that!(file_word(&mem.path, 0x00), eq(0));
    expect_that!(file_word(&mem.path, 0x10), eq(1639));
    expect_that!(file_word(&mem.path, 0x14), eq(100));
    expect_that!(file_word(&mem.path, 0x18), eq(0xFFFF_FFCE));
    expect_that!(file_word(&mem.path, 0x1C), eq(0));

    let readback = operations::read_pid(&config, &TABLE, "11")?;
    expect_that!(
        (readback.setpoint, readback.kp, readback.ki, readback.kd),
        eq((1639, 100, -50, 0))
    );
    Ok(())
}

#[gtest]
#[rstest]
#[case::unknown_channel("13", 100, "PitayadError::UnknownChannel")]
#[case::gain_out_of_range("11", 9000, "PitayadError::Range")]
fn rejected_requests_leave_memory_untouched(
    scratch: (ScratchMemory, SystemConfig),
    #[case] channel: &str,
    #[case] kp: i32,
    #[case] expected: &str,
) {
    let (mem, config) = scratch;
    expect_that!(
        operations::configure_pid(&config, &TABLE, channel, Some(5), kp, 0, 0),
        err(displays_as(contains_substring(expected)))
    );
    let untouched = std::fs::read(&mem.path).expect("scratch memory should be readable");
    expect_that!(untouched.iter().all(|b| *b == 0), eq(true));
}

#[gtest]
#[rstest]
fn gain_limit_follows_config(scratch: (ScratchMemory, SystemConfig)) -> Result<()> {
    let (_mem, mut config) = scratch;
    config.gain_limit = 10_000;
    operations::configure_pid(&config, &TABLE, "22", Some(0), 9000, 0, 0)?;
    let readback = operations::read_pid(&config, &TABLE, "22")?;
    expect_that!(readback.kp, eq(9000));
    Ok(())
}

#[gtest]
#[rstest]
fn clear_pids_zeroes_all(scratch: (ScratchMemory, SystemConfig)) -> Result<()> {
    let (mem, config) = scratch;
    for channel in ["11", "12", "21", "22"] {
        operations::configure_pid(&config, &TABLE, channel, Some(1), 2, 3, 4)?;
    }
    let readbacks = operations::clear_pids(&config, &TABLE)?;
    expect_that!(readbacks.len(), eq(4));
    for offset in (0x10..0x50).step_by(4) {
        expect_that!(file_word(&mem.path, offset), eq(0));
    }
    Ok(())
}

#[gtest]
#[rstest]
#[case::a("A", DacChannel::A, 0x1004)]
#[case::b("b", DacChannel::B, 0x1010)]
fn configure_dac_writes_packed_word(
    scratch: (ScratchMemory, SystemConfig),
    #[case] channel: &str,
    #[case] expected_channel: DacChannel,
    #[case] file_offset: usize,
) -> Result<()> {
    let (mem, config) = scratch;
    operations::configure_dac(&config, &TABLE, channel, -0.5)?;
    let expected = ((0xFFFFu32 << 16) | 16384) & 0x3FFF;
    expect_that!(file_word(&mem.path, file_offset), eq(expected));
    let (dac, word) = operations::read_dac(&config, &TABLE, channel)?;
    expect_that!(dac, eq(expected_channel));
    expect_that!(word, eq(expected));
    Ok(())
}

#[gtest]
#[rstest]
fn acquire_writes_csv(scratch: (ScratchMemory, SystemConfig)) -> Result<()> {
    let (_mem, config) = scratch;
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("capture.csv");
    let mut backend = SimulatedBackend::default();
    let settings = CaptureSettings::from_config(
        &config,
        InputChannel::In2,
        8,
        4,
        TriggerSource::In2PositiveEdge,
        0.1,
    );
    let samples = operations::acquire(&config, &mut backend, settings, Some(&output))?;
    expect_that!(samples.len(), eq(8));

    let text = std::fs::read_to_string(&output)?;
    let lines: Vec<&str> = text.lines().collect();
    expect_that!(lines.len(), eq(8));
    expect_that!(lines[0], eq(format!("0.000000000, {}", samples[0]).as_str()));
    expect_that!(lines[1], starts_with("0.000000032, "));
    Ok(())
}

#[gtest]
#[rstest]
fn read_overlapping_a_held_window_waits(scratch: (ScratchMemory, SystemConfig)) -> Result<()> {
    let (mem, config) = scratch;
    operations::configure_pid(&config, &TABLE, "11", Some(7), 1, 2, 3)?;
    let path = mem.path.clone();
    let holder = std::thread::spawn(move || {
        with_window(&path, PID_BASE, 0x1000, |_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
    });
    std::thread::sleep(Duration::from_millis(50));

    let readback = operations::read_pid(&config, &TABLE, "11")?;
    expect_that!(
        (readback.setpoint, readback.kp, readback.ki, readback.kd),
        eq((7, 1, 2, 3))
    );
    let Ok(held) = holder.join() else {
        return fail!("holding thread panicked");
    };
    expect_that!(held, ok(eq(&())));
    Ok(())
}

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

use crate::common::RecordingBlock;
use crate::hardware::TEST_TABLE;
use googletest::prelude::*;
use pitayad::channels::{ChannelDescriptor, ChannelKind, DacChannel, PidChannel};
use pitayad::codec::{DacValue, PidParameters};
use pitayad::hardware::registers::{RegisterBlock, RegisterOffset};
use pitayad::sequencer::{Verify, apply_dac, apply_pid, clear_pids, read_dac, read_pid};
use rstest::*;

const LIMIT: i32 = 8192;

#[gtest]
fn channel_11_writes_reset_pulse_then_parameters() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    let pid = TEST_TABLE.pid(PidChannel::Pid11);
    let params = PidParameters::new(1639, 100, -50, 0, LIMIT)?;

    let report = apply_pid(&mut regs, &pid, params, Verify::Skip)?;

    expect_that!(report.writes, eq(6));
    expect_that!(report.warnings, is_empty());
    expect_that!(
        regs.write_offsets(),
        elements_are![eq(&0x00), eq(&0x00), eq(&0x10), eq(&0x14), eq(&0x18), eq(&0x1C)]
    );
    expect_that!(
        regs.write_values(),
        elements_are![
            eq(&1),
            eq(&0),
            eq(&1639),
            eq(&100),
            eq(&0xFFFF_FFCE),
            eq(&0)
        ]
    );
    Ok(())
}

#[gtest]
#[rstest]
#[case::pid12(PidChannel::Pid12, 0b0010, [0x20, 0x24, 0x28, 0x2C])]
#[case::pid21(PidChannel::Pid21, 0b0100, [0x30, 0x34, 0x38, 0x3C])]
#[case::pid22(PidChannel::Pid22, 0b1000, [0x40, 0x44, 0x48, 0x4C])]
fn other_channels_pulse_their_own_lane(
    #[case] channel: PidChannel,
    #[case] mask: u32,
    #[case] params: [u32; 4],
) -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    let pid = TEST_TABLE.pid(channel);
    apply_pid(
        &mut regs,
        &pid,
        PidParameters::new(10, 20, 30, 40, LIMIT)?,
        Verify::Skip,
    )?;
    expect_that!(
        regs.write_offsets(),
        elements_are![
            eq(&0x00),
            eq(&0x00),
            eq(&params[0]),
            eq(&params[1]),
            eq(&params[2]),
            eq(&params[3])
        ]
    );
    expect_that!(&regs.write_values()[..2], elements_are![eq(&mask), eq(&0)]);
    Ok(())
}

#[gtest]
fn unknown_channel_issues_no_writes() {
    let regs = RecordingBlock::new(0x1000);
    expect_that!(
        TEST_TABLE.resolve(ChannelKind::Pid, "13"),
        err(displays_as(contains_substring("PitayadError::UnknownChannel")))
    );
    expect_that!(regs.writes, is_empty());
}

#[gtest]
fn out_of_range_gain_issues_no_writes() {
    let regs = RecordingBlock::new(0x1000);
    let result = PidParameters::new(0, 9000, 0, 0, LIMIT);
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::Range")))
    );
    expect_that!(regs.writes, is_empty());
}

#[gtest]
fn too_small_window_is_rejected_before_any_write() {
    let mut regs = RecordingBlock::new(0x18);
    let pid = TEST_TABLE.pid(PidChannel::Pid11);
    let result = apply_pid(&mut regs, &pid, PidParameters::cleared(), Verify::Skip);
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::OutOfBounds")))
    );
    expect_that!(regs.writes, is_empty());
}

#[gtest]
fn failed_write_stops_the_sequence() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    regs.fail_write_at = Some(3);
    let pid = TEST_TABLE.pid(PidChannel::Pid11);
    let result = apply_pid(
        &mut regs,
        &pid,
        PidParameters::new(1, 2, 3, 4, LIMIT)?,
        Verify::Skip,
    );
    expect_that!(
        result,
        err(displays_as(contains_substring("injected write failure")))
    );
    // The writes before the failure stay in effect.
    expect_that!(regs.write_offsets(), elements_are![eq(&0x00), eq(&0x00), eq(&0x10)]);
    expect_that!(regs.word(0x10), eq(1));
    Ok(())
}

#[gtest]
fn written_parameters_read_back() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    let pid = TEST_TABLE.pid(PidChannel::Pid21);
    let report = apply_pid(
        &mut regs,
        &pid,
        PidParameters::new(-8192, 8192, -1, 1, LIMIT)?,
        Verify::ReadBack,
    )?;
    expect_that!(report.warnings, is_empty());
    let readback = read_pid(&regs, &pid)?;
    expect_that!(
        (readback.setpoint, readback.kp, readback.ki, readback.kd),
        eq((-8192, 8192, -1, 1))
    );
    Ok(())
}

#[gtest]
fn mismatched_readback_is_a_warning() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    regs.stuck_register = Some(RegisterOffset::new(0x14));
    let pid = TEST_TABLE.pid(PidChannel::Pid11);
    let report = apply_pid(
        &mut regs,
        &pid,
        PidParameters::new(1639, 100, -50, 0, LIMIT)?,
        Verify::ReadBack,
    )?;
    expect_that!(report.writes, eq(6));
    assert_that!(report.warnings.len(), eq(1));
    expect_that!(report.warnings[0].offset.get(), eq(0x14));
    expect_that!(report.warnings[0].written, eq(100));
    expect_that!(report.warnings[0].read, eq(0));
    Ok(())
}

#[gtest]
fn dac_half_negative_on_channel_a() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    let Ok(ChannelDescriptor::Dac(dac)) = TEST_TABLE.resolve(ChannelKind::Dac, "A") else {
        return fail!("A should resolve to a DAC channel");
    };
    let report = apply_dac(
        &mut regs,
        &dac,
        DacValue::from_analog(DacChannel::A, -0.5),
        Verify::ReadBack,
    )?;
    expect_that!(report.writes, eq(1));
    let expected = ((0xFFFFu32 << 16) | 16384) & 0x3FFF;
    expect_that!(regs.writes, elements_are![eq(&(RegisterOffset::new(0x04), expected))]);
    expect_that!(read_dac(&regs, &dac)?, eq(expected));
    Ok(())
}

#[gtest]
fn dac_value_for_other_channel_is_rejected() {
    let mut regs = RecordingBlock::new(0x1000);
    let dac = TEST_TABLE.dac(DacChannel::B);
    let result = apply_dac(
        &mut regs,
        &dac,
        DacValue::from_analog(DacChannel::A, 0.1),
        Verify::Skip,
    );
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::Argument")))
    );
    expect_that!(regs.writes, is_empty());
}

#[gtest]
fn clear_zeroes_every_controller_in_order() -> Result<()> {
    let mut regs = RecordingBlock::new(0x1000);
    for offset in (0x10..0x50).step_by(4) {
        regs.write32(RegisterOffset::new(offset), 0xDEAD_BEEF)?;
    }
    regs.writes.clear();

    let (readbacks, report) = clear_pids(&mut regs, &TEST_TABLE, Verify::ReadBack)?;

    expect_that!(report.writes, eq(24));
    expect_that!(report.warnings, is_empty());
    expect_that!(
        readbacks.iter().map(|r| r.channel).collect::<Vec<_>>(),
        eq(&PidChannel::ALL.to_vec())
    );
    for readback in &readbacks {
        expect_that!(
            (readback.setpoint, readback.kp, readback.ki, readback.kd),
            eq((0, 0, 0, 0))
        );
    }
    let resets: Vec<u32> = regs
        .writes
        .iter()
        .filter(|(offset, _)| offset.get() == 0)
        .map(|(_, value)| *value)
        .collect();
    expect_that!(resets, eq(&vec![1, 0, 2, 0, 4, 0, 8, 0]));
    Ok(())
}

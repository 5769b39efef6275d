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

use googletest::prelude::*;
use pitayad::acquisition::poller::{
    BufferFillState, PollPolicy, PollTimeout, TriggerState, await_buffer_full, await_trigger,
};
use pitayad::acquisition::simulated::{
    BackendCall, SIMULATED_REGION_START, SIMULATED_TRIGGER_POINTER, SimulatedBackend,
    simulated_sample,
};
use pitayad::acquisition::{
    AcquisitionState, Capture, CaptureSettings, InputChannel, TriggerSource,
};
use rstest::*;
use std::time::{Duration, Instant};

fn fast_policy(max_wait: PollTimeout) -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(1), max_wait)
}

fn settings(samples: u32, max_wait: PollTimeout) -> CaptureSettings {
    CaptureSettings {
        channel: InputChannel::In1,
        samples,
        decimation: 8,
        trigger: TriggerSource::Now,
        trigger_level: 0.25,
        settle: Duration::ZERO,
        poll: fast_policy(max_wait),
    }
}

#[gtest]
fn trigger_on_third_poll() {
    let mut calls = 0;
    let result = await_trigger(
        || {
            calls += 1;
            Ok(if calls == 3 {
                TriggerState::Triggered
            } else {
                TriggerState::Waiting
            })
        },
        &fast_policy(PollTimeout::After(Duration::from_secs(5))),
    );
    expect_that!(result, ok(eq(&TriggerState::Triggered)));
    expect_that!(calls, eq(3));
}

#[gtest]
fn zero_wait_times_out_after_one_poll() {
    let mut calls = 0;
    let start = Instant::now();
    let result = await_buffer_full(
        || {
            calls += 1;
            Ok(BufferFillState::Filling)
        },
        &fast_policy(PollTimeout::After(Duration::ZERO)),
    );
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::Timeout")))
    );
    expect_that!(calls, eq(1));
    expect_that!(start.elapsed(), lt(Duration::from_secs(1)));
}

#[gtest]
fn captures_samples_from_the_trigger_position() -> Result<()> {
    let mut backend = SimulatedBackend::new(Some(2), Some(1));
    let samples = Capture::new(
        &mut backend,
        settings(16, PollTimeout::After(Duration::from_secs(5))),
    )
    .run()?;

    let expected: Vec<i16> = (0..16)
        .map(|i| simulated_sample(SIMULATED_TRIGGER_POINTER + i))
        .collect();
    expect_that!(samples, eq(&expected));
    Ok(())
}

#[gtest]
fn capture_drives_the_library_in_order() -> Result<()> {
    let mut backend = SimulatedBackend::new(Some(1), Some(0));
    Capture::new(
        &mut backend,
        settings(64, PollTimeout::After(Duration::from_secs(5))),
    )
    .run()?;

    let ch = InputChannel::In1;
    expect_that!(
        backend.calls,
        elements_are![
            eq(&BackendCall::MemoryRegion),
            eq(&BackendCall::SetDecimation(8)),
            eq(&BackendCall::SetTriggerDelay(ch, 64)),
            eq(&BackendCall::SetBuffer(ch, SIMULATED_REGION_START, 64)),
            eq(&BackendCall::Enable(ch, true)),
            eq(&BackendCall::SetTriggerLevel(ch, 0.25)),
            eq(&BackendCall::Start),
            eq(&BackendCall::SetTriggerSource(TriggerSource::Now)),
            eq(&BackendCall::TriggerState),
            eq(&BackendCall::TriggerState),
            eq(&BackendCall::BufferFillState(ch)),
            eq(&BackendCall::Stop),
            eq(&BackendCall::WritePointerAtTrigger(ch)),
            eq(&BackendCall::ReadRaw(ch, SIMULATED_TRIGGER_POINTER, 64)),
            eq(&BackendCall::Enable(ch, false)),
        ]
    );
    Ok(())
}

#[gtest]
fn trigger_timeout_stops_and_disables() {
    let mut backend = SimulatedBackend::new(None, None);
    let result = Capture::new(
        &mut backend,
        settings(16, PollTimeout::After(Duration::from_millis(5))),
    )
    .run();
    expect_that!(
        result,
        err(displays_as(contains_substring("Gave up waiting for trigger")))
    );
    let tail = &backend.calls[backend.calls.len() - 2..];
    expect_that!(
        tail,
        elements_are![
            eq(&BackendCall::Stop),
            eq(&BackendCall::Enable(InputChannel::In1, false))
        ]
    );
}

#[gtest]
fn buffer_timeout_stops_and_disables() {
    let mut backend = SimulatedBackend::new(Some(0), None);
    let result = Capture::new(
        &mut backend,
        settings(16, PollTimeout::After(Duration::from_millis(5))),
    )
    .run();
    expect_that!(
        result,
        err(displays_as(contains_substring("Gave up waiting for buffer full")))
    );
    expect_that!(
        backend.calls.last(),
        some(eq(&BackendCall::Enable(InputChannel::In1, false)))
    );
}

#[gtest]
#[rstest]
#[case::no_samples(0, 1)]
#[case::no_decimation(16, 0)]
#[case::larger_than_region(0x0020_0000, 1)]
fn invalid_settings_never_start(#[case] samples: u32, #[case] decimation: u32) {
    let mut backend = SimulatedBackend::default();
    let mut s = settings(samples, PollTimeout::Infinite);
    s.decimation = decimation;
    let result = Capture::new(&mut backend, s).run();
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::Argument")))
    );
    expect_that!(backend.calls.contains(&BackendCall::Start), eq(false));
}

#[gtest]
fn steps_track_state() -> Result<()> {
    let mut backend = SimulatedBackend::new(Some(0), Some(0));
    let mut capture = Capture::new(
        &mut backend,
        settings(4, PollTimeout::After(Duration::from_secs(1))),
    );
    expect_that!(capture.state(), eq(AcquisitionState::Idle));
    expect_that!(
        capture.wait_for_trigger(),
        err(displays_as(contains_substring("PitayadError::Internal")))
    );
    capture.arm()?;
    expect_that!(capture.state(), eq(AcquisitionState::Armed));
    capture.wait_for_trigger()?;
    expect_that!(capture.state(), eq(AcquisitionState::Triggered));
    capture.wait_for_full_buffer()?;
    expect_that!(capture.state(), eq(AcquisitionState::Full));
    capture.stop()?;
    expect_that!(capture.state(), eq(AcquisitionState::Stopped));
    expect_that!(
        capture.arm(),
        err(displays_as(contains_substring("PitayadError::Internal")))
    );
    Ok(())
}

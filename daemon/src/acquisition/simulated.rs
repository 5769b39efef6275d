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

//! In-process acquisition backend.
//!
//! Reports the trigger after a fixed number of trigger polls and a full buffer after a
//! fixed number of fill polls, then returns a deterministic sawtooth. Every call is
//! recorded so a capture's call order can be checked.

use crate::acquisition::poller::{BufferFillState, TriggerState};
use crate::acquisition::{AcquisitionBackend, InputChannel, MemoryRegion, TriggerSource};
use crate::error::PitayadError;
use log::trace;

/// Start of the simulated DMA region.
pub const SIMULATED_REGION_START: u32 = 0x1000_0000;

/// Size of the simulated DMA region: room for 1M samples.
pub const SIMULATED_REGION_SIZE: u32 = 0x0020_0000;

/// Write pointer reported at the trigger.
pub const SIMULATED_TRIGGER_POINTER: u32 = 0x40;

/// One recorded library call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    MemoryRegion,
    SetDecimation(u32),
    SetTriggerDelay(InputChannel, u32),
    SetBuffer(InputChannel, u32, u32),
    Enable(InputChannel, bool),
    SetTriggerLevel(InputChannel, f32),
    SetTriggerSource(TriggerSource),
    Start,
    Stop,
    TriggerState,
    BufferFillState(InputChannel),
    WritePointerAtTrigger(InputChannel),
    ReadRaw(InputChannel, u32, u32),
}

#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    /// Trigger polls answered with `Waiting` before `Triggered`. `None` never triggers.
    pub trigger_after: Option<u32>,
    /// Fill polls answered with `Filling` before `Full`. `None` never fills.
    pub full_after: Option<u32>,
    pub region: MemoryRegion,
    pub calls: Vec<BackendCall>,
    trigger_polls: u32,
    fill_polls: u32,
    started: bool,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        SimulatedBackend::new(Some(2), Some(1))
    }
}

impl SimulatedBackend {
    pub fn new(trigger_after: Option<u32>, full_after: Option<u32>) -> Self {
        SimulatedBackend {
            trigger_after,
            full_after,
            region: MemoryRegion {
                start: SIMULATED_REGION_START,
                size: SIMULATED_REGION_SIZE,
            },
            calls: Vec::new(),
            trigger_polls: 0,
            fill_polls: 0,
            started: false,
        }
    }

    fn record(&mut self, call: BackendCall) {
        trace!("simulated acquisition call: {call:?}");
        self.calls.push(call);
    }
}

/// The sample the simulated ADC produces at `index`: a 14-bit sawtooth.
pub fn simulated_sample(index: u32) -> i16 {
    ((index % 0x4000) as i32 - 0x2000) as i16
}

impl AcquisitionBackend for SimulatedBackend {
    fn memory_region(&mut self) -> Result<MemoryRegion, PitayadError> {
        self.record(BackendCall::MemoryRegion);
        Ok(self.region)
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<(), PitayadError> {
        self.record(BackendCall::SetDecimation(decimation));
        Ok(())
    }

    fn set_trigger_delay(
        &mut self,
        channel: InputChannel,
        samples: u32,
    ) -> Result<(), PitayadError> {
        self.record(BackendCall::SetTriggerDelay(channel, samples));
        Ok(())
    }

    fn set_buffer(
        &mut self,
        channel: InputChannel,
        address: u32,
        samples: u32,
    ) -> Result<(), PitayadError> {
        self.record(BackendCall::SetBuffer(channel, address, samples));
        Ok(())
    }

    fn enable(&mut self, channel: InputChannel, enable: bool) -> Result<(), PitayadError> {
        self.record(BackendCall::Enable(channel, enable));
        Ok(())
    }

    fn set_trigger_level(
        &mut self,
        channel: InputChannel,
        volts: f32,
    ) -> Result<(), PitayadError> {
        self.record(BackendCall::SetTriggerLevel(channel, volts));
        Ok(())
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<(), PitayadError> {
        self.record(BackendCall::SetTriggerSource(source));
        Ok(())
    }

    fn start(&mut self) -> Result<(), PitayadError> {
        self.record(BackendCall::Start);
        self.started = true;
        self.trigger_polls = 0;
        self.fill_polls = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PitayadError> {
        self.record(BackendCall::Stop);
        self.started = false;
        Ok(())
    }

    fn trigger_state(&mut self) -> Result<TriggerState, PitayadError> {
        self.record(BackendCall::TriggerState);
        if !self.started {
            return Err(PitayadError::Acquisition(
                "trigger state read before the acquisition was started".into(),
            ));
        }
        let fired = self.trigger_after.is_some_and(|n| self.trigger_polls >= n);
        self.trigger_polls = self.trigger_polls.saturating_add(1);
        Ok(if fired {
            TriggerState::Triggered
        } else {
            TriggerState::Waiting
        })
    }

    fn buffer_fill_state(
        &mut self,
        channel: InputChannel,
    ) -> Result<BufferFillState, PitayadError> {
        self.record(BackendCall::BufferFillState(channel));
        let full = self.full_after.is_some_and(|n| self.fill_polls >= n);
        self.fill_polls = self.fill_polls.saturating_add(1);
        Ok(if full {
            BufferFillState::Full
        } else {
            BufferFillState::Filling
        })
    }

    fn write_pointer_at_trigger(&mut self, channel: InputChannel) -> Result<u32, PitayadError> {
        self.record(BackendCall::WritePointerAtTrigger(channel));
        Ok(SIMULATED_TRIGGER_POINTER)
    }

    fn read_raw(
        &mut self,
        channel: InputChannel,
        position: u32,
        samples: u32,
    ) -> Result<Vec<i16>, PitayadError> {
        self.record(BackendCall::ReadRaw(channel, position, samples));
        Ok((0..samples)
            .map(|i| simulated_sample(position.wrapping_add(i)))
            .collect())
    }
}

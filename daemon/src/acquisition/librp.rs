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

//! Binding to the Red Pitaya acquisition library (`librp`).
//!
//! Only the AXI capture calls are bound. Every call returns an `int` status where `RP_OK`
//! (0) means success; [`rp_call`] turns anything else into
//! [`PitayadError::Acquisition`] naming the failed function.
//!
//! The library is process-global: it is initialised by [`LibRpBackend::init`] and released
//! when the backend is dropped.

use crate::acquisition::poller::{BufferFillState, TriggerState};
use crate::acquisition::{AcquisitionBackend, InputChannel, MemoryRegion, TriggerSource};
use crate::error::PitayadError;
use log::{error, trace};

type CInt = libc::c_int;
type CUint32 = u32;
type CInt32 = i32;
type CFloat = libc::c_float;
type CBool = bool;

const RP_OK: CInt = 0;

const RP_CH_1: CInt = 0;
const RP_CH_2: CInt = 1;

const RP_T_CH_1: CInt = 0;
const RP_T_CH_2: CInt = 1;

const RP_TRIG_SRC_DISABLED: CInt = 0;
const RP_TRIG_SRC_NOW: CInt = 1;
const RP_TRIG_SRC_CHA_PE: CInt = 2;
const RP_TRIG_SRC_CHA_NE: CInt = 3;
const RP_TRIG_SRC_CHB_PE: CInt = 4;
const RP_TRIG_SRC_CHB_NE: CInt = 5;
const RP_TRIG_SRC_EXT_PE: CInt = 6;
const RP_TRIG_SRC_EXT_NE: CInt = 7;

const RP_TRIG_STATE_TRIGGERED: CInt = 0;

#[link(name = "rp")]
unsafe extern "C" {
    fn rp_InitReset(reset: CBool) -> CInt;
    fn rp_Release() -> CInt;

    fn rp_AcqAxiGetMemoryRegion(start: *mut CUint32, size: *mut CUint32) -> CInt;
    fn rp_AcqAxiSetDecimationFactor(decimation: CUint32) -> CInt;
    fn rp_AcqAxiSetTriggerDelay(channel: CInt, decimated_data_num: CInt32) -> CInt;
    fn rp_AcqAxiSetBufferSamples(channel: CInt, address: CUint32, samples: CUint32) -> CInt;
    fn rp_AcqAxiEnable(channel: CInt, enable: CBool) -> CInt;
    fn rp_AcqSetTriggerLevel(channel: CInt, voltage: CFloat) -> CInt;
    fn rp_AcqStart() -> CInt;
    fn rp_AcqStop() -> CInt;
    fn rp_AcqSetTriggerSrc(source: CInt) -> CInt;
    fn rp_AcqGetTriggerState(state: *mut CInt) -> CInt;
    fn rp_AcqAxiGetBufferFillState(channel: CInt, state: *mut CBool) -> CInt;
    fn rp_AcqAxiGetWritePointerAtTrig(channel: CInt, pos: *mut CUint32) -> CInt;
    fn rp_AcqAxiGetDataRaw(
        channel: CInt,
        pos: CUint32,
        size: *mut CUint32,
        buffer: *mut i16,
    ) -> CInt;
}

/// Run one library call and check its status.
fn rp_call<F>(name: &str, func: F) -> Result<(), PitayadError>
where
    F: FnOnce() -> CInt,
{
    let status = func();
    trace!("{name} returned {status}");
    if status != RP_OK {
        return Err(PitayadError::Acquisition(format!(
            "{name} failed with status {status}"
        )));
    }
    Ok(())
}

fn acq_channel(channel: InputChannel) -> CInt {
    match channel {
        InputChannel::In1 => RP_CH_1,
        InputChannel::In2 => RP_CH_2,
    }
}

fn trigger_channel(channel: InputChannel) -> CInt {
    match channel {
        InputChannel::In1 => RP_T_CH_1,
        InputChannel::In2 => RP_T_CH_2,
    }
}

fn trigger_source(source: TriggerSource) -> CInt {
    match source {
        TriggerSource::Disabled => RP_TRIG_SRC_DISABLED,
        TriggerSource::Now => RP_TRIG_SRC_NOW,
        TriggerSource::In1PositiveEdge => RP_TRIG_SRC_CHA_PE,
        TriggerSource::In1NegativeEdge => RP_TRIG_SRC_CHA_NE,
        TriggerSource::In2PositiveEdge => RP_TRIG_SRC_CHB_PE,
        TriggerSource::In2NegativeEdge => RP_TRIG_SRC_CHB_NE,
        TriggerSource::ExternalPositiveEdge => RP_TRIG_SRC_EXT_PE,
        TriggerSource::ExternalNegativeEdge => RP_TRIG_SRC_EXT_NE,
    }
}

/// Owns the initialised library.
pub struct LibRpBackend {
    _private: (),
}

impl LibRpBackend {
    /// Initialise the library without resetting the FPGA state.
    pub fn init() -> Result<LibRpBackend, PitayadError> {
        rp_call("rp_InitReset", || unsafe { rp_InitReset(false) })?;
        Ok(LibRpBackend { _private: () })
    }
}

impl Drop for LibRpBackend {
    fn drop(&mut self) {
        if let Err(e) = rp_call("rp_Release", || unsafe { rp_Release() }) {
            error!("{e}");
        }
    }
}

impl AcquisitionBackend for LibRpBackend {
    fn memory_region(&mut self) -> Result<MemoryRegion, PitayadError> {
        let mut start: CUint32 = 0;
        let mut size: CUint32 = 0;
        rp_call("rp_AcqAxiGetMemoryRegion", || unsafe {
            rp_AcqAxiGetMemoryRegion(&mut start, &mut size)
        })?;
        Ok(MemoryRegion { start, size })
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<(), PitayadError> {
        rp_call("rp_AcqAxiSetDecimationFactor", || unsafe {
            rp_AcqAxiSetDecimationFactor(decimation)
        })
    }

    fn set_trigger_delay(
        &mut self,
        channel: InputChannel,
        samples: u32,
    ) -> Result<(), PitayadError> {
        let delay = CInt32::try_from(samples).map_err(|_| {
            PitayadError::Argument(format!("trigger delay of {samples} samples is too large"))
        })?;
        rp_call("rp_AcqAxiSetTriggerDelay", || unsafe {
            rp_AcqAxiSetTriggerDelay(acq_channel(channel), delay)
        })
    }

    fn set_buffer(
        &mut self,
        channel: InputChannel,
        address: u32,
        samples: u32,
    ) -> Result<(), PitayadError> {
        rp_call("rp_AcqAxiSetBufferSamples", || unsafe {
            rp_AcqAxiSetBufferSamples(acq_channel(channel), address, samples)
        })
    }

    fn enable(&mut self, channel: InputChannel, enable: bool) -> Result<(), PitayadError> {
        rp_call("rp_AcqAxiEnable", || unsafe {
            rp_AcqAxiEnable(acq_channel(channel), enable)
        })
    }

    fn set_trigger_level(
        &mut self,
        channel: InputChannel,
        volts: f32,
    ) -> Result<(), PitayadError> {
        rp_call("rp_AcqSetTriggerLevel", || unsafe {
            rp_AcqSetTriggerLevel(trigger_channel(channel), volts)
        })
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<(), PitayadError> {
        rp_call("rp_AcqSetTriggerSrc", || unsafe {
            rp_AcqSetTriggerSrc(trigger_source(source))
        })
    }

    fn start(&mut self) -> Result<(), PitayadError> {
        rp_call("rp_AcqStart", || unsafe { rp_AcqStart() })
    }

    fn stop(&mut self) -> Result<(), PitayadError> {
        rp_call("rp_AcqStop", || unsafe { rp_AcqStop() })
    }

    fn trigger_state(&mut self) -> Result<TriggerState, PitayadError> {
        let mut state: CInt = 0;
        rp_call("rp_AcqGetTriggerState", || unsafe {
            rp_AcqGetTriggerState(&mut state)
        })?;
        Ok(if state == RP_TRIG_STATE_TRIGGERED {
            TriggerState::Triggered
        } else {
            TriggerState::Waiting
        })
    }

    fn buffer_fill_state(
        &mut self,
        channel: InputChannel,
    ) -> Result<BufferFillState, PitayadError> {
        let mut full: CBool = false;
        rp_call("rp_AcqAxiGetBufferFillState", || unsafe {
            rp_AcqAxiGetBufferFillState(acq_channel(channel), &mut full)
        })?;
        Ok(if full {
            BufferFillState::Full
        } else {
            BufferFillState::Filling
        })
    }

    fn write_pointer_at_trigger(&mut self, channel: InputChannel) -> Result<u32, PitayadError> {
        let mut pos: CUint32 = 0;
        rp_call("rp_AcqAxiGetWritePointerAtTrig", || unsafe {
            rp_AcqAxiGetWritePointerAtTrig(acq_channel(channel), &mut pos)
        })?;
        Ok(pos)
    }

    fn read_raw(
        &mut self,
        channel: InputChannel,
        position: u32,
        samples: u32,
    ) -> Result<Vec<i16>, PitayadError> {
        let mut buffer = vec![0i16; samples as usize];
        let mut size: CUint32 = samples;
        rp_call("rp_AcqAxiGetDataRaw", || unsafe {
            rp_AcqAxiGetDataRaw(acq_channel(channel), position, &mut size, buffer.as_mut_ptr())
        })?;
        // The library reports how many samples it actually copied.
        buffer.truncate(size.min(samples) as usize);
        Ok(buffer)
    }
}

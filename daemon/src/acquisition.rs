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

//! Triggered capture through the vendor acquisition library.
//!
//! The acquisition engine is driven through the library's own primitives (decimation,
//! trigger source and level, AXI buffer setup, status flags, raw reads); those are
//! abstracted by [`AcquisitionBackend`]. [`Capture`] sequences them and tracks where the
//! engine is:
//!
//! ```text
//! Idle -> Armed -> Waiting -> Triggered -> (settle) -> Filling -> Full -> Stopped
//! ```
//!
//! `Stopped` is only entered through [`Capture::stop`]. A capture that fails after arming
//! is stopped and its channel disabled before the error is handed back.
//!
//! # Backends
//!
//! - [`simulated::SimulatedBackend`] - scripted, runs anywhere
//! - `librp::LibRpBackend` - the vendor C library, with the `librp` feature

pub mod poller;
pub mod simulated;

#[cfg(feature = "librp")]
pub mod librp;

use crate::acquisition::poller::{
    BufferFillState, PollPolicy, TriggerState, await_buffer_full, await_trigger,
};
use crate::config::{AcquisitionBackendKind, SystemConfig};
use crate::error::PitayadError;
use log::{debug, error, info};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fast analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChannel {
    In1,
    In2,
}

impl FromStr for InputChannel {
    type Err = PitayadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(InputChannel::In1),
            "2" => Ok(InputChannel::In2),
            other => Err(PitayadError::UnknownChannel(format!(
                "{other:?} is not an input channel. Expected 1 or 2."
            ))),
        }
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputChannel::In1 => write!(f, "1"),
            InputChannel::In2 => write!(f, "2"),
        }
    }
}

/// Condition that fires the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Disabled,
    /// Trigger immediately.
    Now,
    In1PositiveEdge,
    In1NegativeEdge,
    In2PositiveEdge,
    In2NegativeEdge,
    ExternalPositiveEdge,
    ExternalNegativeEdge,
}

impl FromStr for TriggerSource {
    type Err = PitayadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(TriggerSource::Disabled),
            "now" => Ok(TriggerSource::Now),
            "ch1_pe" => Ok(TriggerSource::In1PositiveEdge),
            "ch1_ne" => Ok(TriggerSource::In1NegativeEdge),
            "ch2_pe" => Ok(TriggerSource::In2PositiveEdge),
            "ch2_ne" => Ok(TriggerSource::In2NegativeEdge),
            "ext_pe" => Ok(TriggerSource::ExternalPositiveEdge),
            "ext_ne" => Ok(TriggerSource::ExternalNegativeEdge),
            other => Err(PitayadError::Argument(format!(
                "unknown trigger source {other:?}. Expected one of now, disabled, ch1_pe, \
                ch1_ne, ch2_pe, ch2_ne, ext_pe, ext_ne."
            ))),
        }
    }
}

/// Reserved DMA memory the AXI engine writes samples into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u32,
    pub size: u32,
}

/// Primitives of the acquisition library.
///
/// Every method maps onto one library call; implementations do not add sequencing of
/// their own.
pub trait AcquisitionBackend {
    fn memory_region(&mut self) -> Result<MemoryRegion, PitayadError>;
    fn set_decimation(&mut self, decimation: u32) -> Result<(), PitayadError>;
    fn set_trigger_delay(&mut self, channel: InputChannel, samples: u32)
    -> Result<(), PitayadError>;
    fn set_buffer(
        &mut self,
        channel: InputChannel,
        address: u32,
        samples: u32,
    ) -> Result<(), PitayadError>;
    fn enable(&mut self, channel: InputChannel, enable: bool) -> Result<(), PitayadError>;
    fn set_trigger_level(&mut self, channel: InputChannel, volts: f32)
    -> Result<(), PitayadError>;
    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<(), PitayadError>;
    fn start(&mut self) -> Result<(), PitayadError>;
    fn stop(&mut self) -> Result<(), PitayadError>;
    fn trigger_state(&mut self) -> Result<TriggerState, PitayadError>;
    fn buffer_fill_state(&mut self, channel: InputChannel)
    -> Result<BufferFillState, PitayadError>;
    fn write_pointer_at_trigger(&mut self, channel: InputChannel) -> Result<u32, PitayadError>;
    fn read_raw(
        &mut self,
        channel: InputChannel,
        position: u32,
        samples: u32,
    ) -> Result<Vec<i16>, PitayadError>;
}

/// What to capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub channel: InputChannel,
    pub samples: u32,
    pub decimation: u32,
    pub trigger: TriggerSource,
    pub trigger_level: f32,
    /// Pause between seeing the trigger and polling the fill flag.
    pub settle: Duration,
    pub poll: PollPolicy,
}

impl CaptureSettings {
    /// Settings with the configured poll policy and settle time.
    pub fn from_config(
        config: &SystemConfig,
        channel: InputChannel,
        samples: u32,
        decimation: u32,
        trigger: TriggerSource,
        trigger_level: f32,
    ) -> Self {
        CaptureSettings {
            channel,
            samples,
            decimation,
            trigger,
            trigger_level,
            settle: config.trigger_settle,
            poll: config.poll_policy,
        }
    }

    fn validate(&self) -> Result<(), PitayadError> {
        if self.samples == 0 {
            return Err(PitayadError::Argument(
                "a capture needs at least one sample".into(),
            ));
        }
        if self.decimation == 0 {
            return Err(PitayadError::Argument("decimation must be at least 1".into()));
        }
        if !self.trigger_level.is_finite() {
            return Err(PitayadError::Argument(format!(
                "trigger level must be a finite voltage, got {}",
                self.trigger_level
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Armed,
    Waiting,
    Triggered,
    Filling,
    Full,
    Stopped,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One capture on one backend.
pub struct Capture<'a> {
    backend: &'a mut dyn AcquisitionBackend,
    settings: CaptureSettings,
    state: AcquisitionState,
}

impl<'a> Capture<'a> {
    pub fn new(backend: &'a mut dyn AcquisitionBackend, settings: CaptureSettings) -> Self {
        Capture {
            backend,
            settings,
            state: AcquisitionState::Idle,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    fn expect_state(&self, expected: &[AcquisitionState], action: &str) -> Result<(), PitayadError> {
        if expected.contains(&self.state) {
            return Ok(());
        }
        Err(PitayadError::Internal(format!(
            "cannot {action} while the acquisition is {}",
            self.state
        )))
    }

    /// Configure the engine and start acquiring. `Idle -> Armed`.
    pub fn arm(&mut self) -> Result<(), PitayadError> {
        self.expect_state(&[AcquisitionState::Idle], "arm")?;
        self.settings.validate()?;
        let s = &self.settings;
        let region = self.backend.memory_region()?;
        debug!(
            "reserved acquisition memory at {:#x}, {:#x} bytes",
            region.start, region.size
        );
        let needed = u64::from(s.samples) * 2;
        if needed > u64::from(region.size) {
            return Err(PitayadError::Argument(format!(
                "{} samples need {needed:#x} bytes but only {:#x} are reserved",
                s.samples, region.size
            )));
        }
        self.backend.set_decimation(s.decimation)?;
        self.backend.set_trigger_delay(s.channel, s.samples)?;
        self.backend.set_buffer(s.channel, region.start, s.samples)?;
        self.backend.enable(s.channel, true)?;
        self.state = AcquisitionState::Armed;
        self.backend.set_trigger_level(s.channel, s.trigger_level)?;
        self.backend.start()?;
        self.backend.set_trigger_source(s.trigger)?;
        info!(
            "armed capture of {} samples on input {} (decimation {}, trigger {:?})",
            s.samples, s.channel, s.decimation, s.trigger
        );
        Ok(())
    }

    /// Poll until the trigger fires. `Armed -> Waiting -> Triggered`.
    pub fn wait_for_trigger(&mut self) -> Result<(), PitayadError> {
        self.expect_state(&[AcquisitionState::Armed], "wait for the trigger")?;
        self.state = AcquisitionState::Waiting;
        let backend = &mut *self.backend;
        await_trigger(|| backend.trigger_state(), &self.settings.poll)?;
        self.state = AcquisitionState::Triggered;
        Ok(())
    }

    /// Let the buffer settle, then poll until it is full.
    /// `Triggered -> Filling -> Full`.
    pub fn wait_for_full_buffer(&mut self) -> Result<(), PitayadError> {
        self.expect_state(&[AcquisitionState::Triggered], "wait for the buffer")?;
        std::thread::sleep(self.settings.settle);
        self.state = AcquisitionState::Filling;
        let channel = self.settings.channel;
        let backend = &mut *self.backend;
        await_buffer_full(|| backend.buffer_fill_state(channel), &self.settings.poll)?;
        self.state = AcquisitionState::Full;
        Ok(())
    }

    /// Stop acquiring and disable the channel. Valid from any armed state.
    pub fn stop(&mut self) -> Result<(), PitayadError> {
        self.expect_state(
            &[
                AcquisitionState::Armed,
                AcquisitionState::Waiting,
                AcquisitionState::Triggered,
                AcquisitionState::Filling,
                AcquisitionState::Full,
            ],
            "stop",
        )?;
        self.backend.stop()?;
        self.backend.enable(self.settings.channel, false)?;
        self.state = AcquisitionState::Stopped;
        debug!("acquisition stopped");
        Ok(())
    }

    /// Read the samples that follow the trigger. Only valid after a full buffer.
    fn read_samples(&mut self) -> Result<Vec<i16>, PitayadError> {
        let channel = self.settings.channel;
        let position = self.backend.write_pointer_at_trigger(channel)?;
        debug!("write pointer at trigger: {position:#x}");
        self.backend.read_raw(channel, position, self.settings.samples)
    }

    /// Run the whole capture and return the raw samples.
    ///
    /// # Returns: `Result<Vec<i16>, PitayadError>`
    /// * `Ok(Vec<i16>)` - `samples` raw ADC codes starting at the trigger
    /// * `Err(PitayadError::Timeout)` - The trigger or the buffer never came; the engine
    ///   has been stopped
    /// * `Err(_)` - A library call failed
    pub fn run(mut self) -> Result<Vec<i16>, PitayadError> {
        let result = self.acquire();
        let armed = !matches!(
            self.state,
            AcquisitionState::Idle | AcquisitionState::Stopped
        );
        if result.is_err()
            && armed
            && let Err(e) = self.stop()
        {
            error!("failed to stop acquisition after an error: {e}");
        }
        result
    }

    fn acquire(&mut self) -> Result<Vec<i16>, PitayadError> {
        self.arm()?;
        self.wait_for_trigger()?;
        self.wait_for_full_buffer()?;
        // Read the trigger position before disabling the channel.
        let channel = self.settings.channel;
        self.backend.stop()?;
        let samples = self.read_samples()?;
        self.backend.enable(channel, false)?;
        self.state = AcquisitionState::Stopped;
        info!("captured {} samples", samples.len());
        Ok(samples)
    }
}

/// The backend selected by the configuration.
///
/// # Returns: `Result<Box<dyn AcquisitionBackend + Send>, PitayadError>`
/// * `Ok(_)` - A ready backend
/// * `Err(PitayadError::Acquisition)` - Acquisition is disabled, or the library could not
///   be initialised
pub fn backend_for(
    config: &SystemConfig,
) -> Result<Box<dyn AcquisitionBackend + Send>, PitayadError> {
    match config.acquisition_backend {
        AcquisitionBackendKind::Simulated => Ok(Box::new(simulated::SimulatedBackend::default())),
        #[cfg(feature = "librp")]
        AcquisitionBackendKind::Librp => Ok(Box::new(librp::LibRpBackend::init()?)),
        #[cfg(not(feature = "librp"))]
        AcquisitionBackendKind::Librp => Err(PitayadError::Acquisition(
            "pitayad was built without the librp feature".into(),
        )),
        AcquisitionBackendKind::None => Err(PitayadError::Acquisition(
            "acquisition is disabled in the configuration".into(),
        )),
    }
}

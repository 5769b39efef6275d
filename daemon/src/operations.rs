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

//! End-to-end hardware operations.
//!
//! Each operation validates its inputs, resolves the channel, maps the register block the
//! channel lives in for the duration of the call and runs the matching sequence. Nothing
//! is mapped if validation or resolution fails.

use crate::acquisition::{AcquisitionBackend, Capture, CaptureSettings};
use crate::channels::{
    AddressingTable, ChannelDescriptor, ChannelKind, DacChannel, DacRegisters, PidChannel,
    PidRegisters,
};
use crate::codec::{DacValue, PidParameters};
use crate::config::{DEFAULT_SETPOINT, SystemConfig};
use crate::error::PitayadError;
use crate::export::write_samples_csv;
use crate::hardware::window::with_window;
use crate::sequencer::{self, PidReadback, SequenceReport};
use log::info;
use std::path::Path;

fn resolve_pid(table: &AddressingTable, channel_id: &str) -> Result<PidRegisters, PitayadError> {
    match table.resolve(ChannelKind::Pid, channel_id)? {
        ChannelDescriptor::Pid(pid) => Ok(pid),
        other => Err(PitayadError::Internal(format!(
            "{other} resolved for a pid channel"
        ))),
    }
}

fn resolve_dac(table: &AddressingTable, channel_id: &str) -> Result<DacRegisters, PitayadError> {
    match table.resolve(ChannelKind::Dac, channel_id)? {
        ChannelDescriptor::Dac(dac) => Ok(dac),
        other => Err(PitayadError::Internal(format!(
            "{other} resolved for a dac channel"
        ))),
    }
}

/// Reset a PID controller and load `setpoint` (or [`DEFAULT_SETPOINT`]) and the gains.
///
/// # Returns: `Result<SequenceReport, PitayadError>`
/// * `Ok(SequenceReport)` - The six writes were issued
/// * `Err(PitayadError::UnknownChannel)` - Nothing was mapped or written
/// * `Err(PitayadError::Range)` - Nothing was mapped or written
/// * `Err(_)` - Mapping or a register access failed
pub fn configure_pid(
    config: &SystemConfig,
    table: &AddressingTable,
    channel_id: &str,
    setpoint: Option<i32>,
    kp: i32,
    ki: i32,
    kd: i32,
) -> Result<SequenceReport, PitayadError> {
    let pid = resolve_pid(table, channel_id)?;
    let params = PidParameters::new(
        setpoint.unwrap_or(DEFAULT_SETPOINT),
        kp,
        ki,
        kd,
        config.gain_limit,
    )?;
    with_window(
        &config.dev_mem_path,
        pid.base_address,
        config.map_size,
        |window| sequencer::apply_pid(window, &pid, params, config.verify_writes.into()),
    )
}

/// Zero every PID controller and return what each one reads back afterwards.
pub fn clear_pids(
    config: &SystemConfig,
    table: &AddressingTable,
) -> Result<Vec<PidReadback>, PitayadError> {
    let base = table.pid(PidChannel::Pid11).base_address;
    let (readbacks, report) = with_window(&config.dev_mem_path, base, config.map_size, |window| {
        sequencer::clear_pids(window, table, config.verify_writes.into())
    })?;
    info!(
        "cleared {} pid channels with {} writes",
        readbacks.len(),
        report.writes
    );
    Ok(readbacks)
}

/// Clamp, encode and write a normalised analog level to a DAC channel.
pub fn configure_dac(
    config: &SystemConfig,
    table: &AddressingTable,
    channel_id: &str,
    value: f64,
) -> Result<SequenceReport, PitayadError> {
    let dac = resolve_dac(table, channel_id)?;
    let encoded = DacValue::from_analog(dac.channel, value);
    with_window(
        &config.dev_mem_path,
        dac.base_address,
        config.map_size,
        |window| sequencer::apply_dac(window, &dac, encoded, config.verify_writes.into()),
    )
}

pub fn read_pid(
    config: &SystemConfig,
    table: &AddressingTable,
    channel_id: &str,
) -> Result<PidReadback, PitayadError> {
    let pid = resolve_pid(table, channel_id)?;
    with_window(
        &config.dev_mem_path,
        pid.base_address,
        config.map_size,
        |window| sequencer::read_pid(window, &pid),
    )
}

pub fn read_dac(
    config: &SystemConfig,
    table: &AddressingTable,
    channel_id: &str,
) -> Result<(DacChannel, u32), PitayadError> {
    let dac = resolve_dac(table, channel_id)?;
    let word = with_window(
        &config.dev_mem_path,
        dac.base_address,
        config.map_size,
        |window| sequencer::read_dac(window, &dac),
    )?;
    Ok((dac.channel, word))
}

/// Run one capture and, if `output` is given, write it out as CSV.
///
/// # Returns: `Result<Vec<i16>, PitayadError>`
/// * `Ok(Vec<i16>)` - The raw samples, also written to `output` when requested
/// * `Err(PitayadError::Timeout)` - Trigger or buffer never came
/// * `Err(_)` - The backend or the output file failed
pub fn acquire(
    config: &SystemConfig,
    backend: &mut dyn AcquisitionBackend,
    settings: CaptureSettings,
    output: Option<&Path>,
) -> Result<Vec<i16>, PitayadError> {
    let decimation = settings.decimation;
    let samples = Capture::new(backend, settings).run()?;
    if let Some(path) = output {
        write_samples_csv(path, &samples, config.sample_rate_hz, decimation)?;
    }
    Ok(samples)
}

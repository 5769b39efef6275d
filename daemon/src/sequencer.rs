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

//! Ordered register transactions.
//!
//! A PID update is always the same six writes:
//!
//! 1. assert the channel's integrator reset lane
//! 2. clear the reset register
//! 3. setpoint
//! 4. kp
//! 5. ki
//! 6. kd
//!
//! The reset pulse puts the integrator in a known state before the new coefficients land,
//! so the order is fixed. Every target is bounds checked before the first write; once
//! writing has started, the first failure stops the sequence and is returned as is.
//! Completed writes cannot be undone, so nothing is rolled back.
//!
//! A DAC update is a single write of the packed word. Both sequences can optionally read
//! the parameter registers back; a mismatch is reported as a [`VerificationWarning`] and
//! does not fail the operation.

use crate::channels::{AddressingTable, DacRegisters, PidChannel, PidRegisters};
use crate::codec::{DacValue, PidParameters, from_register_word};
use crate::error::PitayadError;
use crate::hardware::registers::{RegisterBlock, RegisterOffset};
use log::{debug, info, warn};
use std::fmt;

/// Whether to read registers back after writing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verify {
    Skip,
    ReadBack,
}

impl From<bool> for Verify {
    fn from(value: bool) -> Self {
        if value { Verify::ReadBack } else { Verify::Skip }
    }
}

/// A register that did not read back the value just written to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationWarning {
    pub offset: RegisterOffset,
    pub written: u32,
    pub read: u32,
}

impl fmt::Display for VerificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "register {} read back {:#010x} after writing {:#010x}",
            self.offset, self.read, self.written
        )
    }
}

/// Outcome of a completed sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub writes: usize,
    pub warnings: Vec<VerificationWarning>,
}

/// Current contents of a PID controller's parameter registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidReadback {
    pub channel: PidChannel,
    pub setpoint: i32,
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
}

impl fmt::Display for PidReadback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid {}: setpoint={} kp={} ki={} kd={}",
            self.channel, self.setpoint, self.kp, self.ki, self.kd
        )
    }
}

fn check_targets<R: RegisterBlock + ?Sized>(
    regs: &R,
    offsets: &[RegisterOffset],
) -> Result<(), PitayadError> {
    offsets
        .iter()
        .try_for_each(|offset| offset.check_bounds(regs.len()))
}

fn verify_writes<R: RegisterBlock + ?Sized>(
    regs: &R,
    written: &[(RegisterOffset, u32)],
) -> Result<Vec<VerificationWarning>, PitayadError> {
    let mut warnings = Vec::new();
    for &(offset, value) in written {
        let read = regs.read32(offset)?;
        if read != value {
            let warning = VerificationWarning {
                offset,
                written: value,
                read,
            };
            warn!("{warning}");
            warnings.push(warning);
        }
    }
    Ok(warnings)
}

/// Reset a PID controller and load new parameters.
///
/// # Arguments
///
/// * `regs` - The PID register block
/// * `pid` - The controller's register locations
/// * `params` - Validated parameters, consumed by the call
/// * `verify` - Read the four parameter registers back afterwards
///
/// # Returns: `Result<SequenceReport, PitayadError>`
/// * `Ok(SequenceReport)` - All six writes were issued
/// * `Err(PitayadError::OutOfBounds)` - A target lies outside `regs`; nothing was written
/// * `Err(_)` - A write or read-back failed; the writes before it stay in effect
pub fn apply_pid<R: RegisterBlock + ?Sized>(
    regs: &mut R,
    pid: &PidRegisters,
    params: PidParameters,
    verify: Verify,
) -> Result<SequenceReport, PitayadError> {
    let reset = pid.reset.register();
    let parameter_writes: Vec<(RegisterOffset, u32)> = pid
        .parameter_offsets()
        .into_iter()
        .zip(params.words())
        .collect();

    let mut targets = vec![reset];
    targets.extend(parameter_writes.iter().map(|(offset, _)| *offset));
    check_targets(regs, &targets)?;

    debug!("pid {}: reset pulse on lane {:#04x}", pid.channel, pid.reset.byte_offset);
    regs.write32(reset, pid.reset.assert_mask())?;
    regs.write32(reset, 0)?;

    for &(offset, value) in &parameter_writes {
        debug!("pid {}: write {value:#010x} to {offset}", pid.channel);
        regs.write32(offset, value)?;
    }

    let warnings = match verify {
        Verify::ReadBack => verify_writes(regs, &parameter_writes)?,
        Verify::Skip => Vec::new(),
    };
    info!(
        "pid {} configured: setpoint={} kp={} ki={} kd={}",
        pid.channel,
        params.setpoint(),
        params.kp(),
        params.ki(),
        params.kd()
    );
    Ok(SequenceReport {
        writes: 2 + parameter_writes.len(),
        warnings,
    })
}

/// Write a DAC level.
///
/// # Returns: `Result<SequenceReport, PitayadError>`
/// * `Ok(SequenceReport)` - The packed word was written
/// * `Err(PitayadError::Argument)` - `value` was encoded for the other channel
/// * `Err(PitayadError::OutOfBounds)` - The register lies outside `regs`
pub fn apply_dac<R: RegisterBlock + ?Sized>(
    regs: &mut R,
    dac: &DacRegisters,
    value: DacValue,
    verify: Verify,
) -> Result<SequenceReport, PitayadError> {
    if value.channel != dac.channel {
        return Err(PitayadError::Argument(format!(
            "value for DAC channel {} cannot be written to channel {}",
            value.channel, dac.channel
        )));
    }
    check_targets(regs, &[dac.scale_offset])?;

    let word = value.packed();
    regs.write32(dac.scale_offset, word)?;
    let warnings = match verify {
        Verify::ReadBack => verify_writes(regs, &[(dac.scale_offset, word)])?,
        Verify::Skip => Vec::new(),
    };
    info!(
        "dac {} set: scale={:#x} offset={:#x} word={word:#06x}",
        dac.channel, value.scale, value.offset_flag
    );
    Ok(SequenceReport {
        writes: 1,
        warnings,
    })
}

/// Read a PID controller's parameters without writing anything.
pub fn read_pid<R: RegisterBlock + ?Sized>(
    regs: &R,
    pid: &PidRegisters,
) -> Result<PidReadback, PitayadError> {
    let [setpoint, kp, ki, kd] = pid.parameter_offsets();
    Ok(PidReadback {
        channel: pid.channel,
        setpoint: from_register_word(regs.read32(setpoint)?),
        kp: from_register_word(regs.read32(kp)?),
        ki: from_register_word(regs.read32(ki)?),
        kd: from_register_word(regs.read32(kd)?),
    })
}

/// Read the raw word of a DAC channel.
pub fn read_dac<R: RegisterBlock + ?Sized>(
    regs: &R,
    dac: &DacRegisters,
) -> Result<u32, PitayadError> {
    regs.read32(dac.scale_offset)
}

/// Reset every PID controller and zero its parameters, then read each one back.
///
/// Channels are cleared in table order. The first failure stops the sweep.
pub fn clear_pids<R: RegisterBlock + ?Sized>(
    regs: &mut R,
    table: &AddressingTable,
    verify: Verify,
) -> Result<(Vec<PidReadback>, SequenceReport), PitayadError> {
    let mut total = SequenceReport::default();
    let mut readbacks = Vec::with_capacity(PidChannel::ALL.len());
    for channel in PidChannel::ALL {
        let pid = table.pid(channel);
        let report = apply_pid(regs, &pid, PidParameters::cleared(), verify)?;
        total.writes += report.writes;
        total.warnings.extend(report.warnings);
        readbacks.push(read_pid(regs, &pid)?);
    }
    Ok((readbacks, total))
}

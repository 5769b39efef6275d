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

//! Channel addressing table.
//!
//! Maps logical channel names to register locations. The PID block holds four
//! controllers, `11`, `12`, `21` and `22`, each with a 16-byte parameter stride starting
//! at `0x10`:
//!
//! | channel | reset lane | setpoint | kp   | ki   | kd   |
//! |---------|------------|----------|------|------|------|
//! | 11      | 0x00       | 0x10     | 0x14 | 0x18 | 0x1C |
//! | 12      | 0x01       | 0x20     | 0x24 | 0x28 | 0x2C |
//! | 21      | 0x02       | 0x30     | 0x34 | 0x38 | 0x3C |
//! | 22      | 0x03       | 0x40     | 0x44 | 0x48 | 0x4C |
//!
//! The reset lanes are single-byte offsets into the integrator reset register at `0x00`;
//! lane `n` is bit `n` of that word. The DAC block has two channels whose scale/offset
//! registers sit at `0x04` (A) and `0x10` (B).
//!
//! The table is built once from the configured base addresses and never changes.

use crate::config;
use crate::error::PitayadError;
use crate::hardware::registers::RegisterOffset;
use log::trace;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Integrator reset register shared by the four controllers.
pub const PID_RESET_REGISTER: RegisterOffset = RegisterOffset::new(0x00);
const PID_PARAMETER_BASE: u32 = 0x10;
const PID_STRIDE: u32 = 0x10;

pub const DAC_CH_A_SCALE_OFFSET: RegisterOffset = RegisterOffset::new(0x04);
pub const DAC_CH_B_SCALE_OFFSET: RegisterOffset = RegisterOffset::new(0x10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Pid,
    Dac,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Pid => write!(f, "pid"),
            ChannelKind::Dac => write!(f, "dac"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PidChannel {
    Pid11,
    Pid12,
    Pid21,
    Pid22,
}

impl PidChannel {
    pub const ALL: [PidChannel; 4] = [
        PidChannel::Pid11,
        PidChannel::Pid12,
        PidChannel::Pid21,
        PidChannel::Pid22,
    ];

    /// Position in the PID block, which also selects the reset lane.
    pub const fn index(self) -> u32 {
        match self {
            PidChannel::Pid11 => 0,
            PidChannel::Pid12 => 1,
            PidChannel::Pid21 => 2,
            PidChannel::Pid22 => 3,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            PidChannel::Pid11 => "11",
            PidChannel::Pid12 => "12",
            PidChannel::Pid21 => "21",
            PidChannel::Pid22 => "22",
        }
    }
}

impl FromStr for PidChannel {
    type Err = PitayadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "11" => Ok(PidChannel::Pid11),
            "12" => Ok(PidChannel::Pid12),
            "21" => Ok(PidChannel::Pid21),
            "22" => Ok(PidChannel::Pid22),
            other => Err(PitayadError::UnknownChannel(format!(
                "{other:?} is not a PID channel. Expected one of 11, 12, 21, 22."
            ))),
        }
    }
}

impl fmt::Display for PidChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DacChannel {
    A,
    B,
}

impl DacChannel {
    pub const ALL: [DacChannel; 2] = [DacChannel::A, DacChannel::B];

    pub const fn tag(self) -> &'static str {
        match self {
            DacChannel::A => "A",
            DacChannel::B => "B",
        }
    }
}

impl FromStr for DacChannel {
    type Err = PitayadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(DacChannel::A),
            "B" | "b" => Ok(DacChannel::B),
            other => Err(PitayadError::UnknownChannel(format!(
                "{other:?} is not a DAC channel. Expected A or B."
            ))),
        }
    }
}

impl fmt::Display for DacChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The one-bit reset control of a PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetLane {
    /// Byte offset of the lane within the reset register.
    pub byte_offset: u32,
}

impl ResetLane {
    /// Word holding the lane.
    pub const fn register(self) -> RegisterOffset {
        RegisterOffset::new(self.byte_offset & !0x3)
    }

    /// Value that asserts this lane's reset.
    ///
    /// The offset is read as a bit index into the 32-bit word at 0x0. The other reading,
    /// a byte lane written at 0x01..0x03 with the bit in that byte's LSB, has not been
    /// ruled out. Confirm against the bitstream on hardware.
    pub const fn assert_mask(self) -> u32 {
        1 << self.byte_offset
    }
}

/// Register locations of one PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidRegisters {
    pub channel: PidChannel,
    pub base_address: u64,
    pub reset: ResetLane,
    pub setpoint: RegisterOffset,
    pub kp: RegisterOffset,
    pub ki: RegisterOffset,
    pub kd: RegisterOffset,
}

impl PidRegisters {
    /// Parameter registers in write order: setpoint, kp, ki, kd.
    pub fn parameter_offsets(&self) -> [RegisterOffset; 4] {
        [self.setpoint, self.kp, self.ki, self.kd]
    }
}

/// Register location of one DAC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DacRegisters {
    pub channel: DacChannel,
    pub base_address: u64,
    pub scale_offset: RegisterOffset,
}

/// Everything needed to address one logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDescriptor {
    Pid(PidRegisters),
    Dac(DacRegisters),
}

impl ChannelDescriptor {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelDescriptor::Pid(_) => ChannelKind::Pid,
            ChannelDescriptor::Dac(_) => ChannelKind::Dac,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ChannelDescriptor::Pid(pid) => pid.channel.tag(),
            ChannelDescriptor::Dac(dac) => dac.channel.tag(),
        }
    }

    pub fn base_address(&self) -> u64 {
        match self {
            ChannelDescriptor::Pid(pid) => pid.base_address,
            ChannelDescriptor::Dac(dac) => dac.base_address,
        }
    }

    /// Every register the channel touches.
    pub fn offsets(&self) -> Vec<RegisterOffset> {
        match self {
            ChannelDescriptor::Pid(pid) => {
                let mut offsets = vec![pid.reset.register()];
                offsets.extend(pid.parameter_offsets());
                offsets
            }
            ChannelDescriptor::Dac(dac) => vec![dac.scale_offset],
        }
    }

    /// Bytes a window must span to reach every register of the channel.
    pub fn span(&self) -> usize {
        self.offsets()
            .iter()
            .map(|offset| offset.end())
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelDescriptor::Pid(pid) => write!(
                f,
                "pid {} @ {:#010x}: reset lane {:#04x}, setpoint {}, kp {}, ki {}, kd {}",
                pid.channel,
                pid.base_address,
                pid.reset.byte_offset,
                pid.setpoint,
                pid.kp,
                pid.ki,
                pid.kd
            ),
            ChannelDescriptor::Dac(dac) => write!(
                f,
                "dac {} @ {:#010x}: scale/offset {}",
                dac.channel, dac.base_address, dac.scale_offset
            ),
        }
    }
}

/// Base addresses of the register blocks the table points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressingTable {
    pid_base_address: u64,
    dac_base_address: u64,
}

impl AddressingTable {
    pub const fn new(pid_base_address: u64, dac_base_address: u64) -> Self {
        AddressingTable {
            pid_base_address,
            dac_base_address,
        }
    }

    pub fn pid(&self, channel: PidChannel) -> PidRegisters {
        let block = PID_PARAMETER_BASE + channel.index() * PID_STRIDE;
        PidRegisters {
            channel,
            base_address: self.pid_base_address,
            reset: ResetLane {
                byte_offset: PID_RESET_REGISTER.get() + channel.index(),
            },
            setpoint: RegisterOffset::new(block),
            kp: RegisterOffset::new(block + 0x4),
            ki: RegisterOffset::new(block + 0x8),
            kd: RegisterOffset::new(block + 0xC),
        }
    }

    pub fn dac(&self, channel: DacChannel) -> DacRegisters {
        let scale_offset = match channel {
            DacChannel::A => DAC_CH_A_SCALE_OFFSET,
            DacChannel::B => DAC_CH_B_SCALE_OFFSET,
        };
        DacRegisters {
            channel,
            base_address: self.dac_base_address,
            scale_offset,
        }
    }

    /// Resolve a channel identifier of the given kind.
    ///
    /// # Returns: `Result<ChannelDescriptor, PitayadError>`
    /// * `Ok(ChannelDescriptor)` - The channel's register locations
    /// * `Err(PitayadError::UnknownChannel)` - `channel_id` does not name a channel of `kind`
    pub fn resolve(
        &self,
        kind: ChannelKind,
        channel_id: &str,
    ) -> Result<ChannelDescriptor, PitayadError> {
        trace!("resolving {kind} channel {channel_id:?}");
        match kind {
            ChannelKind::Pid => Ok(ChannelDescriptor::Pid(self.pid(channel_id.parse()?))),
            ChannelKind::Dac => Ok(ChannelDescriptor::Dac(self.dac(channel_id.parse()?))),
        }
    }

    /// All channels, PID first.
    pub fn descriptors(&self) -> Vec<ChannelDescriptor> {
        PidChannel::ALL
            .iter()
            .map(|ch| ChannelDescriptor::Pid(self.pid(*ch)))
            .chain(
                DacChannel::ALL
                    .iter()
                    .map(|ch| ChannelDescriptor::Dac(self.dac(*ch))),
            )
            .collect()
    }
}

static ADDRESSING_TABLE: OnceLock<AddressingTable> = OnceLock::new();

/// The process-wide table, built from the configuration on first use.
pub fn addressing_table() -> Result<&'static AddressingTable, PitayadError> {
    if let Some(table) = ADDRESSING_TABLE.get() {
        return Ok(table);
    }
    let config = config::system_config()?;
    Ok(ADDRESSING_TABLE.get_or_init(|| {
        AddressingTable::new(config.pid_base_address, config.dac_base_address)
    }))
}

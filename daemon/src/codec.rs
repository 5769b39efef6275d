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

//! Conversions between domain values and register words.
//!
//! PID setpoints and gains are written as the two's-complement bit pattern of the signed
//! integer. The PID core interprets them in its own fixed-point unit (1/16384 for the
//! gains); that scaling happens in hardware and nothing here rescales.
//!
//! DAC values start as a normalised analog level in `[-1.0, 1.0]`, become a 16-bit signed
//! code, and are split into a magnitude (`scale`) and a sign flag (`offset_flag`). Only the
//! low 14 bits of the combined word reach the hardware.

use crate::channels::DacChannel;
use crate::error::PitayadError;

/// Full-scale code of the 16-bit signed DAC representation.
pub const DAC_FULL_SCALE: f64 = 32767.0;

/// Bits of the packed DAC word the hardware looks at.
pub const DAC_WORD_MASK: u32 = 0x3FFF;

/// Sign flag for negative DAC codes.
pub const DAC_NEGATIVE_FLAG: u16 = 0xFFFF;

/// Clamp a normalised analog value to `[-1.0, 1.0]`. NaN maps to `0.0`.
pub fn clamp_analog(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(-1.0, 1.0)
}

/// Convert an already clamped analog value to `(scale, offset_flag)`.
///
/// `raw = round(x * 32767)`; `scale = |raw|`; `offset_flag` is `0xFFFF` for negative codes
/// and `0x0000` otherwise.
pub fn to_dac_fixed(x_clamped: f64) -> (u16, u16) {
    let raw = (clamp_analog(x_clamped) * DAC_FULL_SCALE).round() as i16;
    let scale = raw.unsigned_abs();
    let offset_flag = if raw < 0 { DAC_NEGATIVE_FLAG } else { 0x0000 };
    (scale, offset_flag)
}

/// Combine `scale` and `offset_flag` into the register word.
pub fn pack_dac(scale: u16, offset_flag: u16) -> u32 {
    ((u32::from(offset_flag) << 16) | u32::from(scale)) & DAC_WORD_MASK
}

/// A DAC output level ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DacValue {
    pub channel: DacChannel,
    pub scale: u16,
    pub offset_flag: u16,
}

impl DacValue {
    /// Clamp and encode a normalised analog value for `channel`.
    pub fn from_analog(channel: DacChannel, x: f64) -> Self {
        let (scale, offset_flag) = to_dac_fixed(clamp_analog(x));
        DacValue {
            channel,
            scale,
            offset_flag,
        }
    }

    pub fn packed(&self) -> u32 {
        pack_dac(self.scale, self.offset_flag)
    }
}

/// Check that `value` lies in `[-limit, limit]`.
///
/// # Returns: `Result<i32, PitayadError>`
/// * `Ok(i32)` - The unchanged value
/// * `Err(PitayadError::Range)` - The value is out of range
pub fn validate_gain(name: &str, value: i32, limit: i32) -> Result<i32, PitayadError> {
    if value < -limit || value > limit {
        return Err(PitayadError::Range {
            name: name.to_string(),
            value: value.into(),
            limit,
        });
    }
    Ok(value)
}

/// The register word for a signed parameter: its two's-complement bit pattern.
pub fn to_register_word(value: i32) -> u32 {
    value as u32
}

/// Inverse of [`to_register_word`].
pub fn from_register_word(word: u32) -> i32 {
    word as i32
}

/// Validated setpoint and gains for one PID channel.
///
/// The fields can only be set through [`PidParameters::new`] (or
/// [`PidParameters::cleared`]), so a value of this type is always in range. The sequencer
/// takes it by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidParameters {
    setpoint: i32,
    kp: i32,
    ki: i32,
    kd: i32,
}

impl PidParameters {
    /// Validate all four values against `limit` before anything touches hardware.
    ///
    /// # Returns: `Result<PidParameters, PitayadError>`
    /// * `Ok(PidParameters)` - Every value is within `[-limit, limit]`
    /// * `Err(PitayadError::Range)` - The first out-of-range value, in the order setpoint,
    ///   kp, ki, kd
    pub fn new(
        setpoint: i32,
        kp: i32,
        ki: i32,
        kd: i32,
        limit: i32,
    ) -> Result<PidParameters, PitayadError> {
        Ok(PidParameters {
            setpoint: validate_gain("setpoint", setpoint, limit)?,
            kp: validate_gain("kp", kp, limit)?,
            ki: validate_gain("ki", ki, limit)?,
            kd: validate_gain("kd", kd, limit)?,
        })
    }

    /// All zeroes, used to clear a controller.
    pub const fn cleared() -> PidParameters {
        PidParameters {
            setpoint: 0,
            kp: 0,
            ki: 0,
            kd: 0,
        }
    }

    pub fn setpoint(&self) -> i32 {
        self.setpoint
    }

    pub fn kp(&self) -> i32 {
        self.kp
    }

    pub fn ki(&self) -> i32 {
        self.ki
    }

    pub fn kd(&self) -> i32 {
        self.kd
    }

    /// Register words in write order: setpoint, kp, ki, kd.
    pub fn words(&self) -> [u32; 4] {
        [
            to_register_word(self.setpoint),
            to_register_word(self.kp),
            to_register_word(self.ki),
            to_register_word(self.kd),
        ]
    }
}

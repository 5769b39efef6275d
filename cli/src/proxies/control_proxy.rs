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

use zbus::{Result, proxy};
#[proxy(
    default_service = "com.canonical.pitayad",
    interface = "com.canonical.pitayad.control",
    default_path = "/com/canonical/pitayad/control"
)]
pub trait Control {
    async fn set_pid(
        &self,
        channel: &str,
        setpoint: i32,
        kp: i32,
        ki: i32,
        kd: i32,
    ) -> Result<String>;
    async fn set_pid_gains(&self, channel: &str, kp: i32, ki: i32, kd: i32) -> Result<String>;
    async fn clear_pids(&self) -> Result<String>;
    async fn set_dac(&self, channel: &str, value: f64) -> Result<String>;
    async fn set_gain_limit(&self, limit: i32) -> Result<String>;
    #[allow(clippy::too_many_arguments)]
    async fn acquire(
        &self,
        channel: &str,
        samples: u32,
        decimation: u32,
        trigger: &str,
        level: f64,
        timeout_ms: i64,
        output_path: &str,
    ) -> Result<String>;
}

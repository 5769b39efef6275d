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
    interface = "com.canonical.pitayad.status",
    default_path = "/com/canonical/pitayad/status"
)]
pub trait Status {
    async fn get_pid(&self, channel: &str) -> Result<String>;
    async fn get_dac(&self, channel: &str) -> Result<String>;
    async fn get_channels(&self) -> Result<String>;
    async fn get_gain_limit(&self) -> Result<String>;
}

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

use crate::channels::addressing_table;
use crate::comm::dbus::channels_message;
use crate::config;
use crate::operations;
use log::info;
use zbus::{fdo, interface};

pub struct StatusInterface {}

#[interface(name = "com.canonical.pitayad.status")]
impl StatusInterface {
    async fn get_pid(&self, channel: &str) -> Result<String, fdo::Error> {
        info!("get_pid called with channel: {channel}");
        let config = config::system_config()?;
        let readback = operations::read_pid(&config, addressing_table()?, channel)?;
        Ok(readback.to_string())
    }

    async fn get_dac(&self, channel: &str) -> Result<String, fdo::Error> {
        info!("get_dac called with channel: {channel}");
        let config = config::system_config()?;
        let (dac, word) = operations::read_dac(&config, addressing_table()?, channel)?;
        Ok(format!("dac {dac}: {word:#06x}"))
    }

    async fn get_channels(&self) -> Result<String, fdo::Error> {
        info!("get_channels called");
        Ok(channels_message(&addressing_table()?.descriptors()))
    }

    async fn get_gain_limit(&self) -> Result<String, fdo::Error> {
        info!("get_gain_limit called");
        Ok(config::gain_limit()?.to_string())
    }
}

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

//! Status command: read back channel state without writing anything.

use crate::StatusSubcommand;
use crate::proxies::status_proxy;
use zbus::Connection;

/// Sends the DBus command to read a PID controller's parameters.
pub async fn call_get_pid(channel: &str) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    proxy.get_pid(channel).await
}

pub async fn call_get_dac(channel: &str) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    proxy.get_dac(channel).await
}

pub async fn call_get_channels() -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    proxy.get_channels().await
}

pub async fn call_get_gain_limit() -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = status_proxy::StatusProxy::new(&connection).await?;
    proxy.get_gain_limit().await
}

/// Splits the `kind:tag: description` lines of `GetChannels` into `(kind, tag)` pairs.
pub fn parse_channel_list(channels: &str) -> Vec<(String, String)> {
    channels
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            match (parts.next(), parts.next()) {
                (Some(kind), Some(tag)) if !kind.is_empty() && !tag.is_empty() => {
                    Some((kind.trim().to_string(), tag.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Every channel's current state plus the gain limit, as an ascii table.
async fn get_full_status_message() -> Result<String, zbus::Error> {
    let mut ret_string = format!(
        "---- LIMITS ----\n\
        gain limit: {}\n\
        \n---- CHANNELS ----\n",
        call_get_gain_limit().await?
    );
    for (kind, tag) in parse_channel_list(&call_get_channels().await?) {
        let state = match kind.as_str() {
            "pid" => call_get_pid(&tag).await?,
            "dac" => call_get_dac(&tag).await?,
            _ => continue,
        };
        ret_string.push_str(&format!("| {kind} | {tag} | {state} |\n"));
    }
    Ok(ret_string)
}

/// Handler for the status command.
pub async fn status_handler(target: &Option<StatusSubcommand>) -> Result<String, zbus::Error> {
    match target {
        None => get_full_status_message().await,
        Some(StatusSubcommand::Pid { channel }) => call_get_pid(channel).await,
        Some(StatusSubcommand::Dac { channel }) => call_get_dac(channel).await,
        Some(StatusSubcommand::Channels) => call_get_channels().await,
    }
}

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

//! PID commands: configure one controller, or clear all four.
//!
//! Gains and setpoint are range-checked by the daemon against its configured gain limit;
//! the CLI only forwards them. Without a setpoint the daemon applies its own default.

use crate::proxies::control_proxy;
use zbus::Connection;

/// Sends the DBus command to reset a PID controller and load new parameters.
async fn call_set_pid(
    channel: &str,
    setpoint: i32,
    kp: i32,
    ki: i32,
    kd: i32,
) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    proxy.set_pid(channel, setpoint, kp, ki, kd).await
}

async fn call_set_pid_gains(
    channel: &str,
    kp: i32,
    ki: i32,
    kd: i32,
) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    proxy.set_pid_gains(channel, kp, ki, kd).await
}

async fn call_clear_pids() -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    proxy.clear_pids().await
}

/// Handler for the pid command.
///
/// # Examples
///
/// ```bash
/// pitaya pid 11 100 -50 0
/// pitaya pid 22 100 -50 0 2000
/// ```
pub async fn pid_handler(
    channel: &str,
    kp: i32,
    ki: i32,
    kd: i32,
    setpoint: Option<i32>,
) -> Result<String, zbus::Error> {
    match setpoint {
        Some(setpoint) => call_set_pid(channel, setpoint, kp, ki, kd).await,
        None => call_set_pid_gains(channel, kp, ki, kd).await,
    }
}

/// Handler for the clear command. Returns each controller's state after clearing.
pub async fn clear_handler() -> Result<String, zbus::Error> {
    call_clear_pids().await
}

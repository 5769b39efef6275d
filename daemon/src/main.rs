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

//! Red Pitaya register daemon (pitayad) - System service owning the FPGA control blocks.
//!
//! The daemon is the only process that maps the PID and DAC register blocks, so every
//! register write on the board goes through one writer. It:
//! - Exposes two DBus interfaces: `control` and `status`
//! - Configures PID controllers and DAC outputs through memory-mapped registers
//! - Runs triggered captures through the acquisition library
//!
//! # DBus Service
//!
//! - **Service Name**: `com.canonical.pitayad`
//! - **Status Interface**: `/com/canonical/pitayad/status` - Read-only operations
//! - **Control Interface**: `/com/canonical/pitayad/control` - Write operations
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`

use log::info;
use pitayad::channels::addressing_table;
use pitayad::comm::dbus::{control_interface::ControlInterface, status_interface::StatusInterface};
use pitayad::config;
use std::error::Error;
use std::future::pending;
use zbus::connection;

/// Main entry point for the pitayad daemon.
///
/// Loads the configuration and builds the addressing table before claiming the bus name,
/// so a broken configuration is reported at startup rather than on the first request.
///
/// # Examples
///
/// ```bash
/// # Run with default logging (info level)
/// pitayad
///
/// # Run with debug logging
/// RUST_LOG=debug pitayad
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let system_config = config::system_config()?;
    info!(
        "Using {:?} with pid block at {:#010x} and dac block at {:#010x}, acquisition backend {:?}",
        system_config.dev_mem_path,
        system_config.pid_base_address,
        system_config.dac_base_address,
        system_config.acquisition_backend
    );
    for descriptor in addressing_table()?.descriptors() {
        info!("{descriptor}");
    }

    let status_interface = StatusInterface {};
    let control_interface = ControlInterface {};

    let _conn = connection::Builder::system()?
        .name("com.canonical.pitayad")?
        .serve_at("/com/canonical/pitayad/status", status_interface)?
        .serve_at("/com/canonical/pitayad/control", control_interface)?
        .build()
        .await?;

    info!("Started com.canonical.pitayad dbus service");
    pending::<()>().await;

    Ok(())
}

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

//! Acquire command: run one triggered capture on the daemon.
//!
//! The daemon writes the CSV itself, inside its configured capture directory. `--output`
//! is sent as given and resolved by the daemon relative to that directory.

use crate::AcquireArgs;
use crate::proxies::control_proxy;
use std::path::Path;
use zbus::Connection;

/// Bus argument for `--output`; empty when no file is wanted.
pub fn output_argument(output: Option<&Path>) -> String {
    output
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
async fn call_acquire(
    channel: &str,
    samples: u32,
    decimation: u32,
    trigger: &str,
    level: f64,
    timeout_ms: i64,
    output_path: &str,
) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    proxy
        .acquire(
            channel,
            samples,
            decimation,
            trigger,
            level,
            timeout_ms,
            output_path,
        )
        .await
}

/// Handler for the acquire command.
///
/// # Examples
///
/// ```bash
/// pitaya acquire --samples 1024 --decimation 8 --output capture.csv
/// pitaya acquire --trigger ch1_pe --level 0.25 --timeout-ms -1
/// ```
pub async fn acquire_handler(args: &AcquireArgs) -> Result<String, zbus::Error> {
    call_acquire(
        &args.channel,
        args.samples,
        args.decimation,
        &args.trigger,
        args.level,
        args.timeout_ms,
        &output_argument(args.output.as_deref()),
    )
    .await
}

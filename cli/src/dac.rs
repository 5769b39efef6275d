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

//! DAC command.
//!
//! With a value the level is written once. Without one the command reads levels from
//! stdin, one per line, until `q`, `quit` or end of input:
//!
//! ```text
//! $ pitaya dac A
//! value> 0.5
//! dac A set to 0.5 (1 writes)
//! value> half
//! invalid value "half": expected a number between -1.0 and 1.0
//! value> q
//! ```
//!
//! Values outside `[-1.0, 1.0]` are clamped by the daemon.

use crate::proxies::control_proxy;
use log::debug;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use zbus::Connection;

/// What one line of interactive input asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum DacInput {
    Value(f64),
    Skip,
    Quit,
}

/// Interpret one line of interactive input.
pub fn parse_dac_line(line: &str) -> Result<DacInput, String> {
    let line = line.trim();
    match line {
        "" => Ok(DacInput::Skip),
        "q" | "quit" | "exit" => Ok(DacInput::Quit),
        _ => match line.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(DacInput::Value(value)),
            _ => Err(format!(
                "invalid value {line:?}: expected a number between -1.0 and 1.0"
            )),
        },
    }
}

async fn call_set_dac(
    proxy: &control_proxy::ControlProxy<'_>,
    channel: &str,
    value: f64,
) -> Result<String, zbus::Error> {
    proxy.set_dac(channel, value).await
}

fn prompt() {
    print!("value> ");
    // A prompt that fails to flush only delays the prompt text.
    let _ = std::io::stdout().flush();
}

async fn interactive(
    proxy: &control_proxy::ControlProxy<'_>,
    channel: &str,
) -> Result<String, zbus::Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut written = 0usize;
    prompt();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| zbus::Error::Failure(format!("failed to read stdin: {e}")))?
    {
        match parse_dac_line(&line) {
            Ok(DacInput::Value(value)) => {
                println!("{}", call_set_dac(proxy, channel, value).await?);
                written += 1;
            }
            Ok(DacInput::Skip) => debug!("skipping empty line"),
            Ok(DacInput::Quit) => break,
            Err(message) => eprintln!("{message}"),
        }
        prompt();
    }
    Ok(format!("{written} values written to dac {channel}"))
}

/// Handler for the dac command.
pub async fn dac_handler(channel: &str, value: Option<f64>) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    match value {
        Some(value) => call_set_dac(&proxy, channel, value).await,
        None => interactive(&proxy, channel).await,
    }
}

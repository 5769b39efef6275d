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

//! Command-line client for the pitayad daemon.
//!
//! Every command is one or more DBus calls to `com.canonical.pitayad`; the daemon owns the
//! hardware and does all validation. The process exits non-zero if any call fails.
//!
//! # Error Handling
//!
//! Errors from the daemon arrive as `zbus::Error` whose message starts with the daemon's
//! error kind, e.g. `PitayadError::Range: kp = 9000 is outside the accepted range`.

mod acquire;
mod dac;
mod pid;
mod proxies;
mod status;

use clap::{Args, Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pitaya")]
#[command(bin_name = "pitaya")]
#[command(about = "Configure the PID, DAC and acquisition blocks of a Red Pitaya")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reset a PID controller and load new gains
    Pid {
        /// PID channel: 11, 12, 21 or 22
        channel: String,
        #[arg(allow_hyphen_values = true)]
        kp: i32,
        #[arg(allow_hyphen_values = true)]
        ki: i32,
        #[arg(allow_hyphen_values = true)]
        kd: i32,
        /// Defaults to 1639
        #[arg(allow_hyphen_values = true)]
        setpoint: Option<i32>,
    },
    /// Reset and zero all four PID controllers
    Clear,
    /// Set a DAC output level in [-1.0, 1.0]; reads levels from stdin when no value is given
    Dac {
        /// DAC channel: A or B
        channel: String,
        #[arg(allow_hyphen_values = true)]
        value: Option<f64>,
    },
    /// Change the accepted magnitude of setpoints and gains
    GainLimit { limit: i32 },
    /// Read back channel state
    Status {
        #[command(subcommand)]
        target: Option<StatusSubcommand>,
    },
    /// Run a triggered capture
    Acquire(AcquireArgs),
}

#[derive(Subcommand, Debug)]
pub enum StatusSubcommand {
    Pid { channel: String },
    Dac { channel: String },
    Channels,
}

#[derive(Args, Debug)]
pub struct AcquireArgs {
    /// Fast analog input: 1 or 2
    #[arg(long, default_value = "1")]
    pub channel: String,
    #[arg(long, default_value_t = 64)]
    pub samples: u32,
    #[arg(long, default_value_t = 1)]
    pub decimation: u32,
    /// now, disabled, ch1_pe, ch1_ne, ch2_pe, ch2_ne, ext_pe or ext_ne
    #[arg(long, default_value = "now")]
    pub trigger: String,
    /// Trigger level in volts
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub level: f64,
    /// Give up after this long; negative waits forever
    #[arg(long, default_value_t = 10_000, allow_hyphen_values = true)]
    pub timeout_ms: i64,
    /// CSV file for the samples, inside the daemon's capture directory
    #[arg(long)]
    pub output: Option<PathBuf>,
}

async fn call_set_gain_limit(limit: i32) -> Result<String, zbus::Error> {
    let connection = zbus::Connection::system().await?;
    let proxy = proxies::control_proxy::ControlProxy::new(&connection).await?;
    proxy.set_gain_limit(limit).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    let result = match &cli.command {
        Commands::Pid {
            channel,
            kp,
            ki,
            kd,
            setpoint,
        } => pid::pid_handler(channel, *kp, *ki, *kd, *setpoint).await,
        Commands::Clear => pid::clear_handler().await,
        Commands::Dac { channel, value } => dac::dac_handler(channel, *value).await,
        Commands::GainLimit { limit } => call_set_gain_limit(*limit).await,
        Commands::Status { target } => status::status_handler(target).await,
        Commands::Acquire(args) => acquire::acquire_handler(args).await,
    };
    match result {
        Ok(msg) => {
            println!("{msg}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            Err(e.into())
        }
    }
}

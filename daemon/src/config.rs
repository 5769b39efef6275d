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

//! Daemon configuration.
//!
//! Hardcoded defaults describe the stock Red Pitaya bitstream. Any subset of them may be
//! overridden by `/etc/pitayad/config.toml`:
//!
//! ```toml
//! [hardware]
//! dev_mem_path = "/dev/mem"
//! pid_base_address = 0x40300000
//! dac_base_address = 0x40100000
//! map_size = 4096
//! gain_limit = 8192
//! verify_writes = true
//!
//! [acquisition]
//! backend = "librp"          # "librp", "simulated" or "none"
//! poll_interval_ms = 1
//! max_poll_interval_ms = 50
//! timeout_ms = 10000         # or "infinite"
//! trigger_settle_ms = 1000
//! sample_rate_hz = 125000000.0
//! output_dir = "/var/lib/pitayad/captures"
//! ```
//!
//! A missing or malformed file is not fatal: the daemon logs a warning and keeps the
//! hardcoded values.

use crate::acquisition::poller::{PollPolicy, PollTimeout};
use crate::error::PitayadError;
use crate::system_io::fs_read;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

/// Location of the optional configuration file.
pub static CONFIG_FILE_PATH: &str = "/etc/pitayad/config.toml";

/// The physical memory character device.
pub static DEV_MEM_PATH: &str = "/dev/mem";

/// Physical base address of the PID register block.
pub const PID_BASE_ADDRESS: u64 = 0x4030_0000;

/// Physical base address of the DAC register block.
pub const DAC_BASE_ADDRESS: u64 = 0x4010_0000;

/// Bytes mapped per register block.
pub const MAP_SIZE: usize = 0x1000;

/// Accepted magnitude for setpoints and gains.
///
/// Hardware notes disagree between 8192 and 8196; 8192 matches the 2^14 fixed-point unit
/// of the PID core. Needs confirmation against the bitstream documentation.
pub const DEFAULT_GAIN_LIMIT: i32 = 8192;

/// Setpoint used when a caller configures a PID channel without one.
pub const DEFAULT_SETPOINT: i32 = 1639;

/// ADC sampling clock.
pub const ADC_SAMPLE_RATE_HZ: f64 = 125_000_000.0;

/// The only directory capture output may be written to.
pub static DEFAULT_OUTPUT_DIR: &str = "/var/lib/pitayad/captures";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TRIGGER_SETTLE: Duration = Duration::from_secs(1);

/// Which implementation of the acquisition library the daemon drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionBackendKind {
    /// The vendor C library, only available when built with the `librp` feature.
    Librp,
    /// Scripted in-process backend for bench use without hardware.
    Simulated,
    /// Acquisition requests are rejected.
    None,
}

impl Default for AcquisitionBackendKind {
    fn default() -> Self {
        if cfg!(feature = "librp") {
            AcquisitionBackendKind::Librp
        } else {
            AcquisitionBackendKind::None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub dev_mem_path: PathBuf,
    pub pid_base_address: u64,
    pub dac_base_address: u64,
    pub map_size: usize,
    pub gain_limit: i32,
    pub verify_writes: bool,
    pub acquisition_backend: AcquisitionBackendKind,
    pub poll_policy: PollPolicy,
    pub trigger_settle: Duration,
    pub sample_rate_hz: f64,
    pub output_dir: PathBuf,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            dev_mem_path: PathBuf::from(DEV_MEM_PATH),
            pid_base_address: PID_BASE_ADDRESS,
            dac_base_address: DAC_BASE_ADDRESS,
            map_size: MAP_SIZE,
            gain_limit: DEFAULT_GAIN_LIMIT,
            verify_writes: true,
            acquisition_backend: AcquisitionBackendKind::default(),
            poll_policy: PollPolicy {
                interval: DEFAULT_POLL_INTERVAL,
                max_interval: DEFAULT_MAX_POLL_INTERVAL,
                max_wait: PollTimeout::After(DEFAULT_POLL_TIMEOUT),
            },
            trigger_settle: DEFAULT_TRIGGER_SETTLE,
            sample_rate_hz: ADC_SAMPLE_RATE_HZ,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    hardware: Option<HardwareToml>,
    acquisition: Option<AcquisitionToml>,
}

#[derive(Debug, Default, Deserialize)]
struct HardwareToml {
    dev_mem_path: Option<PathBuf>,
    pid_base_address: Option<u64>,
    dac_base_address: Option<u64>,
    map_size: Option<usize>,
    gain_limit: Option<i32>,
    verify_writes: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AcquisitionToml {
    backend: Option<AcquisitionBackendKind>,
    poll_interval_ms: Option<u64>,
    max_poll_interval_ms: Option<u64>,
    timeout_ms: Option<TimeoutToml>,
    trigger_settle_ms: Option<u64>,
    sample_rate_hz: Option<f64>,
    output_dir: Option<PathBuf>,
}

/// `timeout_ms` is either a number of milliseconds or the word `"infinite"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeoutToml {
    Millis(u64),
    Keyword(String),
}

impl TryFrom<TimeoutToml> for PollTimeout {
    type Error = PitayadError;

    fn try_from(value: TimeoutToml) -> Result<Self, Self::Error> {
        match value {
            TimeoutToml::Millis(ms) => Ok(PollTimeout::After(Duration::from_millis(ms))),
            TimeoutToml::Keyword(word) if word.eq_ignore_ascii_case("infinite") => {
                Ok(PollTimeout::Infinite)
            }
            TimeoutToml::Keyword(word) => Err(PitayadError::Argument(format!(
                "timeout_ms must be a number of milliseconds or \"infinite\", got {word:?}"
            ))),
        }
    }
}

impl SystemConfig {
    /// Build a config from TOML text, starting from the hardcoded defaults.
    pub fn from_toml_str(toml_string: &str, origin: &Path) -> Result<SystemConfig, PitayadError> {
        let parsed: TomlConfig = toml::from_str(toml_string).map_err(|e| PitayadError::TomlDe {
            file: origin.to_path_buf(),
            e,
        })?;
        trace!("User provided config: {parsed:?}");

        let mut config = SystemConfig::default();
        let hardware = parsed.hardware.unwrap_or_default();
        if let Some(path) = hardware.dev_mem_path {
            config.dev_mem_path = path;
        }
        if let Some(base) = hardware.pid_base_address {
            config.pid_base_address = base;
        }
        if let Some(base) = hardware.dac_base_address {
            config.dac_base_address = base;
        }
        if let Some(size) = hardware.map_size {
            config.map_size = size;
        }
        if let Some(limit) = hardware.gain_limit {
            config.gain_limit = validate_gain_limit(limit)?;
        }
        if let Some(verify) = hardware.verify_writes {
            config.verify_writes = verify;
        }

        let acquisition = parsed.acquisition.unwrap_or_default();
        if let Some(backend) = acquisition.backend {
            config.acquisition_backend = backend;
        }
        if let Some(ms) = acquisition.poll_interval_ms {
            config.poll_policy.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = acquisition.max_poll_interval_ms {
            config.poll_policy.max_interval = Duration::from_millis(ms);
        }
        if config.poll_policy.max_interval < config.poll_policy.interval {
            trace!("max_poll_interval_ms below poll_interval_ms, polling at a fixed interval");
            config.poll_policy.max_interval = config.poll_policy.interval;
        }
        if let Some(timeout) = acquisition.timeout_ms {
            config.poll_policy.max_wait = timeout.try_into()?;
        }
        if let Some(ms) = acquisition.trigger_settle_ms {
            config.trigger_settle = Duration::from_millis(ms);
        }
        if let Some(rate) = acquisition.sample_rate_hz {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(PitayadError::Argument(format!(
                    "sample_rate_hz must be a positive number, got {rate}"
                )));
            }
            config.sample_rate_hz = rate;
        }
        if let Some(dir) = acquisition.output_dir {
            if !dir.is_absolute() {
                return Err(PitayadError::Argument(format!(
                    "output_dir must be an absolute path, got {dir:?}"
                )));
            }
            config.output_dir = dir;
        }
        Ok(config)
    }
}

/// The gain limit is a magnitude, so it must be positive.
pub fn validate_gain_limit(limit: i32) -> Result<i32, PitayadError> {
    if limit <= 0 {
        return Err(PitayadError::Argument(format!(
            "gain_limit must be a positive integer, got {limit}"
        )));
    }
    Ok(limit)
}

fn config_from_file(config_path: &Path) -> Result<SystemConfig, PitayadError> {
    if !config_path.is_file() {
        return Err(PitayadError::Internal(format!(
            "Config file not found in {config_path:?}. Using hardcoded defaults"
        )));
    }
    let toml_string = fs_read(config_path)?;
    SystemConfig::from_toml_str(&toml_string, config_path)
}

static CONFIG: OnceLock<Mutex<SystemConfig>> = OnceLock::new();

fn init_system_config() -> Mutex<SystemConfig> {
    match config_from_file(Path::new(CONFIG_FILE_PATH)) {
        Ok(config) => {
            trace!("Successfully loaded config: {config:?}");
            Mutex::new(config)
        }
        Err(e) => {
            warn!("Using hardcoded defaults because failed to load config: {e}");
            Mutex::new(SystemConfig::default())
        }
    }
}

fn system_config_guard() -> Result<MutexGuard<'static, SystemConfig>, PitayadError> {
    CONFIG
        .get_or_init(init_system_config)
        .lock()
        .map_err(|e| PitayadError::Internal(format!("Failed when locking config: {e}")))
}

/// Snapshot of the process-wide configuration.
pub fn system_config() -> Result<SystemConfig, PitayadError> {
    Ok(system_config_guard()?.clone())
}

pub fn gain_limit() -> Result<i32, PitayadError> {
    Ok(system_config_guard()?.gain_limit)
}

pub fn set_gain_limit(limit: i32) -> Result<(), PitayadError> {
    let limit = validate_gain_limit(limit)?;
    system_config_guard()?.gain_limit = limit;
    Ok(())
}

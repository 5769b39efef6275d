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

use crate::acquisition::{CaptureSettings, InputChannel, TriggerSource, backend_for};
use crate::channels::addressing_table;
use crate::comm::dbus::{poll_timeout_from_ms, report_message, validate_output_path};
use crate::config;
use crate::error::PitayadError;
use crate::operations;
use log::{info, trace};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use zbus::{fdo, interface};

static WRITE_LOCK: OnceCell<Arc<Mutex<()>>> = OnceCell::const_new();

async fn get_write_lock_guard() -> MutexGuard<'static, ()> {
    let lock = WRITE_LOCK
        .get_or_init(|| async { Arc::new(Mutex::new(())) })
        .await;
    lock.lock().await
}

pub struct ControlInterface {}

#[interface(name = "com.canonical.pitayad.control")]
impl ControlInterface {
    async fn set_pid(
        &self,
        channel: &str,
        setpoint: i32,
        kp: i32,
        ki: i32,
        kd: i32,
    ) -> Result<String, fdo::Error> {
        info!(
            "set_pid called with channel: {channel}, setpoint: {setpoint}, kp: {kp}, ki: {ki}, \
            kd: {kd}"
        );
        let config = config::system_config()?;
        let table = addressing_table()?;
        let _guard = get_write_lock_guard().await;
        trace!("Got write lock.");
        let report =
            operations::configure_pid(&config, table, channel, Some(setpoint), kp, ki, kd)?;
        Ok(report_message(
            &format!("pid {channel} configured: setpoint={setpoint} kp={kp} ki={ki} kd={kd}"),
            &report,
        ))
    }

    async fn set_pid_gains(
        &self,
        channel: &str,
        kp: i32,
        ki: i32,
        kd: i32,
    ) -> Result<String, fdo::Error> {
        info!("set_pid_gains called with channel: {channel}, kp: {kp}, ki: {ki}, kd: {kd}");
        let config = config::system_config()?;
        let table = addressing_table()?;
        let _guard = get_write_lock_guard().await;
        trace!("Got write lock.");
        let report = operations::configure_pid(&config, table, channel, None, kp, ki, kd)?;
        Ok(report_message(
            &format!("pid {channel} configured with the default setpoint: kp={kp} ki={ki} kd={kd}"),
            &report,
        ))
    }

    async fn clear_pids(&self) -> Result<String, fdo::Error> {
        info!("clear_pids called");
        let config = config::system_config()?;
        let table = addressing_table()?;
        let _guard = get_write_lock_guard().await;
        trace!("Got write lock.");
        let readbacks = operations::clear_pids(&config, table)?;
        Ok(readbacks
            .iter()
            .map(|readback| readback.to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn set_dac(&self, channel: &str, value: f64) -> Result<String, fdo::Error> {
        info!("set_dac called with channel: {channel} and value: {value}");
        let config = config::system_config()?;
        let table = addressing_table()?;
        let _guard = get_write_lock_guard().await;
        trace!("Got write lock.");
        let report = operations::configure_dac(&config, table, channel, value)?;
        Ok(report_message(&format!("dac {channel} set to {value}"), &report))
    }

    async fn set_gain_limit(&self, limit: i32) -> Result<String, fdo::Error> {
        info!("set_gain_limit called with limit: {limit}");
        let _guard = get_write_lock_guard().await;
        config::set_gain_limit(limit)?;
        Ok(format!("gain limit set to {limit}"))
    }

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
    ) -> Result<String, fdo::Error> {
        info!(
            "acquire called with channel: {channel}, samples: {samples}, decimation: \
            {decimation}, trigger: {trigger}, level: {level}, timeout_ms: {timeout_ms} and \
            output_path: {output_path}"
        );
        let config = config::system_config()?;
        let input: InputChannel = channel.parse()?;
        let trigger: TriggerSource = trigger.parse()?;
        let output = validate_output_path(output_path, &config.output_dir)?;
        let mut settings = CaptureSettings::from_config(
            &config,
            input,
            samples,
            decimation,
            trigger,
            level as f32,
        );
        settings.poll.max_wait = poll_timeout_from_ms(timeout_ms);

        let _guard = get_write_lock_guard().await;
        trace!("Got write lock.");
        let captured = tokio::task::spawn_blocking(move || {
            let mut backend = backend_for(&config)?;
            operations::acquire(&config, backend.as_mut(), settings, output.as_deref())
                .map(|samples| (samples.len(), output))
        })
        .await
        .map_err(|e| PitayadError::Internal(format!("acquisition task failed: {e}")))?;
        let (count, output) = captured?;
        Ok(match output {
            Some(path) => format!("captured {count} samples on input {input}, written to {path:?}"),
            None => format!("captured {count} samples on input {input}"),
        })
    }
}

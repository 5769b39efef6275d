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

//! Bounded polling of trigger and buffer-fill status.
//!
//! The acquisition hardware gives no interrupt for either event, so both are observed by
//! calling a status function in a loop. The loop sleeps between polls, doubling the sleep
//! up to [`PollPolicy::max_interval`], and gives up once [`PollPolicy::max_wait`] has
//! elapsed. An unbounded wait is only possible by asking for [`PollTimeout::Infinite`].

use crate::error::PitayadError;
use log::debug;
use std::time::{Duration, Instant};

/// Snapshot of the trigger flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Waiting,
    Triggered,
}

/// Snapshot of the buffer-fill flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFillState {
    Filling,
    Full,
}

/// Upper bound on how long a poll loop may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTimeout {
    /// Poll until the state is observed, however long that takes.
    Infinite,
    /// Give up once this much time has passed since the first poll.
    After(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep after the first unsuccessful poll.
    pub interval: Duration,
    /// Ceiling for the doubling sleep. Equal to `interval` for a fixed cadence.
    pub max_interval: Duration,
    pub max_wait: PollTimeout,
}

impl PollPolicy {
    /// Poll at a fixed `interval` until `max_wait`.
    pub fn fixed(interval: Duration, max_wait: PollTimeout) -> Self {
        PollPolicy {
            interval,
            max_interval: interval,
            max_wait,
        }
    }
}

/// Poll `poll_fn` until it reports [`TriggerState::Triggered`].
///
/// # Returns: `Result<TriggerState, PitayadError>`
/// * `Ok(TriggerState::Triggered)` - The trigger fired
/// * `Err(PitayadError::Timeout)` - `max_wait` elapsed first
/// * `Err(_)` - `poll_fn` itself failed; polling stops at the first failure
pub fn await_trigger<F>(poll_fn: F, policy: &PollPolicy) -> Result<TriggerState, PitayadError>
where
    F: FnMut() -> Result<TriggerState, PitayadError>,
{
    poll_until("trigger", TriggerState::Triggered, poll_fn, policy)
}

/// Poll `poll_fn` until it reports [`BufferFillState::Full`].
///
/// # Returns: `Result<BufferFillState, PitayadError>`
/// * `Ok(BufferFillState::Full)` - The buffer holds the requested samples
/// * `Err(PitayadError::Timeout)` - `max_wait` elapsed first
/// * `Err(_)` - `poll_fn` itself failed; polling stops at the first failure
pub fn await_buffer_full<F>(
    poll_fn: F,
    policy: &PollPolicy,
) -> Result<BufferFillState, PitayadError>
where
    F: FnMut() -> Result<BufferFillState, PitayadError>,
{
    poll_until("buffer full", BufferFillState::Full, poll_fn, policy)
}

fn poll_until<T, F>(
    what: &'static str,
    target: T,
    mut poll_fn: F,
    policy: &PollPolicy,
) -> Result<T, PitayadError>
where
    T: PartialEq + Copy + std::fmt::Debug,
    F: FnMut() -> Result<T, PitayadError>,
{
    let start = Instant::now();
    let mut sleep = policy.interval;
    let mut polls: u64 = 0;
    loop {
        let state = poll_fn()?;
        polls += 1;
        if state == target {
            debug!("{what} observed after {polls} polls ({:?})", start.elapsed());
            return Ok(state);
        }

        let elapsed = start.elapsed();
        let nap = match policy.max_wait {
            PollTimeout::Infinite => sleep,
            PollTimeout::After(max_wait) => {
                if elapsed >= max_wait {
                    return Err(PitayadError::Timeout {
                        what,
                        polls,
                        elapsed,
                    });
                }
                sleep.min(max_wait - elapsed)
            }
        };
        debug!("waiting for {what}: poll {polls} saw {state:?}, sleeping {nap:?}");
        std::thread::sleep(nap);
        sleep = (sleep * 2).min(policy.max_interval.max(policy.interval));
    }
}

#[cfg(test)]
mod test_poll_until {
    use crate::acquisition::poller::{
        BufferFillState, PollPolicy, PollTimeout, TriggerState, await_buffer_full, await_trigger,
    };
    use crate::error::PitayadError;
    use googletest::prelude::*;
    use std::time::Duration;

    #[gtest]
    fn backoff_sleep_is_capped() {
        let policy = PollPolicy {
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            max_wait: PollTimeout::Infinite,
        };
        let mut calls = 0;
        let r = await_buffer_full(
            || {
                calls += 1;
                Ok(if calls == 5 {
                    BufferFillState::Full
                } else {
                    BufferFillState::Filling
                })
            },
            &policy,
        );
        expect_that!(r, ok(eq(&BufferFillState::Full)));
        expect_that!(calls, eq(5));
    }

    #[gtest]
    fn poll_error_stops_the_loop() {
        let mut calls = 0;
        let r = await_trigger(
            || {
                calls += 1;
                Err(PitayadError::Acquisition("status read failed".into()))
            },
            &PollPolicy::fixed(Duration::from_millis(1), PollTimeout::Infinite),
        );
        expect_that!(
            r,
            err(displays_as(contains_substring("status read failed")))
        );
        expect_that!(calls, eq(1));
    }

    #[gtest]
    fn times_out_after_bounded_wait() {
        let r = await_trigger(
            || Ok(TriggerState::Waiting),
            &PollPolicy::fixed(
                Duration::from_millis(2),
                PollTimeout::After(Duration::from_millis(10)),
            ),
        );
        expect_that!(
            r,
            err(displays_as(contains_substring("PitayadError::Timeout")))
        );
    }
}

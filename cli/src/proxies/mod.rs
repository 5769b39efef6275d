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

//! DBus proxy interfaces for the pitayad daemon.
//!
//! Generated with the `zbus` `#[proxy]` macro; the CLI's command handlers use them to
//! call the daemon over the system bus.
//!
//! - **Service Name**: `com.canonical.pitayad`
//! - **Control Interface**: `com.canonical.pitayad.control` at `/com/canonical/pitayad/control`
//! - **Status Interface**: `com.canonical.pitayad.status` at `/com/canonical/pitayad/status`

pub mod control_proxy;
pub mod status_proxy;

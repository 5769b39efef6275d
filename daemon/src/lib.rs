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

//! Register access core for the PID, DAC and acquisition blocks of a Red Pitaya FPGA.
//!
//! Values flow one way: caller input is validated and encoded by [`codec`], located by
//! [`channels`], ordered by [`sequencer`] and written through a [`hardware::window`].
//! Captured samples flow back through [`acquisition`] and out via [`export`].
//! [`operations`] strings these together for one request at a time; the daemon binary
//! serves them over D-Bus through [`comm`].

pub mod acquisition;
pub mod channels;
pub mod codec;
pub mod comm;
pub mod config;
pub mod error;
pub mod export;
pub mod hardware;
pub mod operations;
pub mod sequencer;
pub mod system_io;

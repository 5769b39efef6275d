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

//! Raw access to FPGA register blocks.
//!
//! - [`window`] owns a page-aligned mapping of physical memory and releases it on every
//!   exit path.
//! - [`registers`] defines word-aligned offsets and the [`registers::RegisterBlock`]
//!   trait through which all 32-bit register traffic flows.
//!
//! Everything above this module (the sequencer and the hardware operations) is written
//! against `RegisterBlock`, so it can run against a mapped window on the board or against
//! any other implementation of the trait.

pub mod registers;
pub mod window;

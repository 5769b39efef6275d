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

use crate::common::{file_word, scratch_memory};
use googletest::prelude::*;
use pitayad::hardware::registers::{RegisterBlock, RegisterOffset};
use pitayad::hardware::window::{PhysicalWindow, with_window};
use rstest::*;
use std::path::Path;
use std::thread;
use std::time::Duration;

#[gtest]
fn writes_reach_the_backing_file_at_the_base_offset() -> Result<()> {
    let mem = scratch_memory(0x2000);
    let mut window = PhysicalWindow::acquire(&mem.path, 0x1000, 0x1000)?;
    window.write32(RegisterOffset::new(0x14), 0x1234_5678)?;
    expect_that!(window.read32(RegisterOffset::new(0x14))?, eq(0x1234_5678));
    window.release()?;
    expect_that!(file_word(&mem.path, 0x1014), eq(0x1234_5678));
    expect_that!(file_word(&mem.path, 0x0014), eq(0));
    Ok(())
}

#[gtest]
fn length_rounds_up_to_a_page() -> Result<()> {
    let mem = scratch_memory(0x2000);
    let window = PhysicalWindow::acquire(&mem.path, 0, 0x20)?;
    expect_that!(window.len() % rustix::param::page_size(), eq(0));
    expect_that!(window.len(), ge(0x20));
    window.release()?;
    Ok(())
}

#[gtest]
fn access_past_the_end_is_out_of_bounds() -> Result<()> {
    let mem = scratch_memory(0x1000);
    let mut window = PhysicalWindow::acquire(&mem.path, 0, 0x1000)?;
    let end = RegisterOffset::new(window.len() as u32);
    expect_that!(
        window.write32(end, 1),
        err(displays_as(contains_substring("PitayadError::OutOfBounds")))
    );
    expect_that!(
        window.read32(end),
        err(displays_as(contains_substring("PitayadError::OutOfBounds")))
    );
    window.release()?;
    Ok(())
}

#[gtest]
fn same_block_cannot_be_mapped_twice() -> Result<()> {
    let mem = scratch_memory(0x2000);
    let first = PhysicalWindow::try_acquire(&mem.path, 0, 0x1000)?;
    expect_that!(
        PhysicalWindow::try_acquire(&mem.path, 0, 0x1000),
        err(displays_as(contains_substring("already mapped")))
    );
    // A different block of the same device is fine.
    let second = PhysicalWindow::try_acquire(&mem.path, 0x1000, 0x1000)?;
    first.release()?;
    second.release()?;
    // Released blocks can be mapped again.
    PhysicalWindow::try_acquire(&mem.path, 0, 0x1000)?.release()?;
    Ok(())
}

#[gtest]
fn acquire_waits_for_the_holder_to_release() -> Result<()> {
    let mem = scratch_memory(0x1000);
    let holder = PhysicalWindow::acquire(&mem.path, 0, 0x1000)?;
    let path = mem.path.clone();
    let waiter = thread::spawn(move || {
        with_window(&path, 0, 0x1000, |window| window.read32(RegisterOffset::new(0x8)))
    });

    thread::sleep(Duration::from_millis(100));
    let mut holder = holder;
    holder.write32(RegisterOffset::new(0x8), 42)?;
    holder.release()?;

    // The waiter only sees the value written just before the release.
    let Ok(value) = waiter.join() else {
        return fail!("waiting thread panicked");
    };
    expect_that!(value, ok(eq(&42)));
    Ok(())
}

#[gtest]
fn dropping_a_window_releases_it() -> Result<()> {
    let mem = scratch_memory(0x1000);
    drop(PhysicalWindow::acquire(&mem.path, 0, 0x1000)?);
    PhysicalWindow::acquire(&mem.path, 0, 0x1000)?.release()?;
    Ok(())
}

#[gtest]
#[rstest]
#[case::missing_device(Path::new("/nonexistent/pitayad/mem"), 0, 0x1000)]
#[case::misaligned_base(Path::new("/nonexistent/pitayad/mem"), 0x10, 0x1000)]
#[case::empty(Path::new("/nonexistent/pitayad/mem"), 0, 0)]
fn map_failures(#[case] path: &Path, #[case] base: u64, #[case] len: usize) {
    expect_that!(
        PhysicalWindow::acquire(path, base, len),
        err(displays_as(contains_substring("PitayadError::Map")))
    );
}

#[gtest]
fn with_window_releases_on_error() -> Result<()> {
    let mem = scratch_memory(0x1000);
    let result: std::result::Result<(), _> = with_window(&mem.path, 0, 0x1000, |window| {
        window.write32(RegisterOffset::new(0x10_000), 1)
    });
    expect_that!(
        result,
        err(displays_as(contains_substring("PitayadError::OutOfBounds")))
    );
    // The failed closure still released the block.
    let value = with_window(&mem.path, 0, 0x1000, |window| {
        window.write32(RegisterOffset::new(0x4), 7)?;
        window.read32(RegisterOffset::new(0x4))
    })?;
    expect_that!(value, eq(7));
    Ok(())
}

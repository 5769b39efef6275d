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

//! Scoped mappings of physical memory.
//!
//! A [`PhysicalWindow`] opens the physical memory device with `O_SYNC`, maps a
//! page-aligned region shared read/write, and unmaps it when released or dropped. The
//! process keeps a registry of live `(device, base address)` pairs so the same register
//! block is never mapped twice at once from this crate: [`PhysicalWindow::acquire`] waits
//! for the current holder to release the block, [`PhysicalWindow::try_acquire`] fails
//! instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use pitayad::hardware::registers::{RegisterBlock, RegisterOffset};
//! # use pitayad::hardware::window::with_window;
//! # use std::path::{Path, PathBuf};
//! # fn example() -> Result<(), pitayad::error::PitayadError> {
//! let kp = with_window(Path::new("/dev/mem"), 0x4030_0000, 0x1000, |window| {
//!     window.read32(RegisterOffset::new(0x14))
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::error::PitayadError;
use crate::hardware::registers::{RegisterBlock, RegisterOffset};
use log::{debug, error, trace};
use rustix::fs::{Mode, OFlags};
use rustix::mm::{MapFlags, ProtFlags, mmap, munmap};
use std::collections::HashSet;
use std::ffi::c_void;
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Condvar, Mutex, OnceLock};

type WindowKey = (PathBuf, u64);

/// Windows currently mapped by this process.
struct LiveWindows {
    keys: Mutex<HashSet<WindowKey>>,
    released: Condvar,
}

static LIVE_WINDOWS: OnceLock<LiveWindows> = OnceLock::new();

fn live_windows() -> &'static LiveWindows {
    LIVE_WINDOWS.get_or_init(|| LiveWindows {
        keys: Mutex::new(HashSet::new()),
        released: Condvar::new(),
    })
}

/// Claim `key`. With `wait` set, blocks until no other window holds it.
fn reserve(key: &WindowKey, wait: bool) -> Result<bool, PitayadError> {
    let registry = live_windows();
    let lock_error =
        |e: String| PitayadError::Internal(format!("Failed to lock window registry: {e}"));
    let mut live = registry.keys.lock().map_err(|e| lock_error(e.to_string()))?;
    while wait && live.contains(key) {
        trace!("Waiting for {:#010x} of {:?} to be released", key.1, key.0);
        live = registry
            .released
            .wait(live)
            .map_err(|e| lock_error(e.to_string()))?;
    }
    Ok(live.insert(key.clone()))
}

fn unreserve(key: &WindowKey) {
    let registry = live_windows();
    match registry.keys.lock() {
        Ok(mut live) => {
            live.remove(key);
        }
        Err(e) => error!(
            "Failed to lock window registry to release {:#010x} of {:?}: {e}",
            key.1, key.0
        ),
    }
    registry.released.notify_all();
}

/// An owned, mapped window of physical memory.
#[derive(Debug)]
pub struct PhysicalWindow {
    key: WindowKey,
    base_address: u64,
    len: usize,
    mapping: Option<NonNull<u8>>,
    device: Option<OwnedFd>,
}

impl PhysicalWindow {
    /// Map `length` bytes of physical memory starting at `base_address`.
    ///
    /// `length` is rounded up to a whole number of pages. The device at `dev_mem_path` is
    /// opened read/write with `O_SYNC` so the kernel maps the region uncached. If another
    /// window of this process holds the same block, the call blocks until it is released.
    ///
    /// # Returns: `Result<PhysicalWindow, PitayadError>`
    /// * `Ok(PhysicalWindow)` - The mapped window
    /// * `Err(PitayadError::Map)` - Misaligned base, zero length, or the open/mmap call
    ///   failed
    pub fn acquire(
        dev_mem_path: &Path,
        base_address: u64,
        length: usize,
    ) -> Result<PhysicalWindow, PitayadError> {
        Self::open_window(dev_mem_path, base_address, length, true)
    }

    /// Like [`PhysicalWindow::acquire`], but fails with `Map` (address in use) instead of
    /// waiting when the block is already mapped by this process.
    pub fn try_acquire(
        dev_mem_path: &Path,
        base_address: u64,
        length: usize,
    ) -> Result<PhysicalWindow, PitayadError> {
        Self::open_window(dev_mem_path, base_address, length, false)
    }

    fn open_window(
        dev_mem_path: &Path,
        base_address: u64,
        length: usize,
        wait: bool,
    ) -> Result<PhysicalWindow, PitayadError> {
        let page_size = rustix::param::page_size();
        let len = length.div_ceil(page_size) * page_size;
        let map_error = |e: std::io::Error| PitayadError::Map {
            path: dev_mem_path.to_path_buf(),
            base: base_address,
            len,
            e,
        };

        if base_address % page_size as u64 != 0 {
            return Err(map_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("base address is not aligned to the {page_size:#x} byte page size"),
            )));
        }
        if len == 0 {
            return Err(map_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cannot map an empty window",
            )));
        }
        let key = (dev_mem_path.to_path_buf(), base_address);
        if !reserve(&key, wait)? {
            return Err(map_error(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "this register block is already mapped by the process",
            )));
        }

        match Self::map(dev_mem_path, base_address, len) {
            Ok((mapping, device)) => {
                debug!("Mapped {len:#x} bytes at {base_address:#010x} from {dev_mem_path:?}");
                Ok(PhysicalWindow {
                    key,
                    base_address,
                    len,
                    mapping: Some(mapping),
                    device: Some(device),
                })
            }
            Err(e) => {
                unreserve(&key);
                Err(map_error(e))
            }
        }
    }

    fn map(
        dev_mem_path: &Path,
        base_address: u64,
        len: usize,
    ) -> Result<(NonNull<u8>, OwnedFd), std::io::Error> {
        let device = rustix::fs::open(
            dev_mem_path,
            OFlags::RDWR | OFlags::SYNC | OFlags::CLOEXEC,
            Mode::empty(),
        )?;

        // SAFETY: a fresh shared mapping chosen by the kernel; nothing else aliases it.
        // The pointer is only dereferenced through volatile accesses that are bounds
        // checked against `len`, and it is unmapped exactly once in `unmap`.
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &device,
                base_address,
            )?
        };
        let mapping = NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
            std::io::Error::other("mmap returned a null pointer")
        })?;
        Ok((mapping, device))
    }

    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Unmap the window and close the device handle.
    ///
    /// # Returns: `Result<(), PitayadError>`
    /// * `Ok(())` - The window is gone
    /// * `Err(PitayadError::Unmap)` - `munmap` failed; the registry entry and the device
    ///   handle are released regardless
    pub fn release(mut self) -> Result<(), PitayadError> {
        self.unmap()
    }

    fn unmap(&mut self) -> Result<(), PitayadError> {
        let Some(mapping) = self.mapping.take() else {
            return Ok(());
        };
        // SAFETY: `mapping` and `len` come from the successful mmap in `acquire`, and
        // `take()` above guarantees this runs once.
        let result = unsafe { munmap(mapping.as_ptr().cast::<c_void>(), self.len) };
        self.device.take();
        unreserve(&self.key);
        trace!("Unmapped window at {:#010x}", self.base_address);
        result.map_err(|e| PitayadError::Unmap {
            base: self.base_address,
            e: e.into(),
        })
    }

    fn word_ptr(&self, offset: RegisterOffset) -> Result<*mut u32, PitayadError> {
        offset.check_bounds(self.len)?;
        let mapping = self
            .mapping
            .ok_or_else(|| PitayadError::Internal("window has already been released".into()))?;
        // SAFETY: `offset + 4 <= len` was checked above and the mapping is page aligned,
        // so the word is inside the mapping and 4-byte aligned.
        Ok(unsafe { mapping.as_ptr().add(offset.get() as usize) }.cast::<u32>())
    }
}

impl RegisterBlock for PhysicalWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn read32(&self, offset: RegisterOffset) -> Result<u32, PitayadError> {
        let ptr = self.word_ptr(offset)?;
        // SAFETY: see `word_ptr`. Volatile so every call is a fresh bus read.
        let value = unsafe { ptr.read_volatile() };
        trace!("read {value:#010x} from {:#010x}+{offset}", self.base_address);
        Ok(value)
    }

    fn write32(&mut self, offset: RegisterOffset, value: u32) -> Result<(), PitayadError> {
        let ptr = self.word_ptr(offset)?;
        trace!("write {value:#010x} to {:#010x}+{offset}", self.base_address);
        // SAFETY: see `word_ptr`. Volatile so the compiler neither elides nor merges writes.
        unsafe { ptr.write_volatile(value) };
        Ok(())
    }
}

impl Drop for PhysicalWindow {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            error!("{e}");
        }
    }
}

/// Run `f` against a freshly mapped window and release it afterwards.
///
/// The window is released on every path. If `f` fails its error is returned and a
/// release failure is only logged; if `f` succeeds a release failure is logged and the
/// successful result is still returned.
pub fn with_window<T, F>(
    dev_mem_path: &Path,
    base_address: u64,
    length: usize,
    f: F,
) -> Result<T, PitayadError>
where
    F: FnOnce(&mut PhysicalWindow) -> Result<T, PitayadError>,
{
    let mut window = PhysicalWindow::acquire(dev_mem_path, base_address, length)?;
    let result = f(&mut window);
    if let Err(e) = window.release() {
        error!("{e}");
    }
    result
}


// netlab: Routing Lab Orchestration on Linux Network Namespaces
// Copyright (C) 2021  The netlab developers
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Cross-context execution
//!
//! Run a closure on the current thread, temporarily switched into the network namespace of a
//! node. This is how the runtime talks to services which only listen on the loopback interface
//! of a node, like the ZeroTier API.
//!
//! Switches are serialized by a process-wide lock. The original namespace of the thread is
//! restored when the guard is dropped, which happens on every exit path of the closure,
//! including a panic. If the namespace cannot be restored, the thread would silently keep
//! operating in the wrong namespace, so the process is aborted instead.

use crate::{Error, Result};

use lazy_static::lazy_static;
use log::*;

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

lazy_static! {
    static ref SWITCH_LOCK: Mutex<()> = Mutex::new(());
}

/// Path to the network namespace of a process.
pub fn node_context_path(pid: u32) -> PathBuf {
    PathBuf::from(format!("/proc/{}/ns/net", pid))
}

/// Run `f` inside the network namespace of the process `pid`.
pub fn run_in_node_context<T, F>(pid: u32, f: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    run_in_context(node_context_path(pid), f)
}

/// Run `f` inside the network namespace referred to by `path`, which is either a namespace file
/// under `/proc/<pid>/ns/` or a bind mount of one.
pub fn run_in_context<T, F>(path: impl AsRef<Path>, f: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    let _guard = NetnsGuard::enter(path.as_ref())?;
    Ok(f())
}

/// Guard holding the current thread inside a foreign network namespace. Dropping it switches
/// back.
pub struct NetnsGuard {
    original: File,
    _lock: MutexGuard<'static, ()>,
}

impl std::fmt::Debug for NetnsGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetnsGuard")
    }
}

impl NetnsGuard {
    /// Switch the current thread into the namespace at `path`.
    pub fn enter(path: &Path) -> Result<Self> {
        // a panic while holding the lock does not leave the namespace switched
        let lock = SWITCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let original = File::open(THREAD_NETNS).map_err(Error::ContextSwitch)?;
        let target = File::open(path).map_err(Error::ContextSwitch)?;
        setns(&target).map_err(Error::ContextSwitch)?;
        trace!("Entered network namespace {}", path.display());
        Ok(Self { original, _lock: lock })
    }
}

impl Drop for NetnsGuard {
    fn drop(&mut self) {
        if let Err(e) = setns(&self.original) {
            error!("Cannot restore the original network namespace: {}", e);
            std::process::abort();
        }
        trace!("Restored the original network namespace");
    }
}

fn setns(file: &File) -> io::Result<()> {
    let ret = unsafe { libc::setns(file.as_raw_fd(), libc::CLONE_NEWNET) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

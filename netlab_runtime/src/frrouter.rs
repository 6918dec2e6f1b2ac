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

//! # Router lifecycle
//!
//! A [`RoutingInstance`] drives one FRRouting instance running inside a node. Each instance gets
//! its own pathspace (configuration directory), derived from a context identifier which is unique
//! in the process. The daemons enter the network namespace of the node through a named namespace
//! link, which `watchfrr` is told about with `--netns`.
//!
//! The instance moves through `Unconfigured → Provisioning → Running → Terminating →
//! Terminated`. A failed step leaves the node in an undefined state: it is not rolled back, the
//! node must be terminated and rebuilt.

use crate::config::FrrConfig;
use crate::shell::{quote, Shell};
use crate::{Error, Result};
use netlab::topology::{Daemon, DaemonSet, RouterAttrs, Vrf};

use itertools::Itertools;
use lazy_static::lazy_static;
use log::*;
use rand::Rng;

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// MTU of all router interfaces: a 1500 byte frame plus the MPLS label stack.
pub const LABELED_MTU: u32 = 1600;
/// Size of the MPLS label table
pub const PLATFORM_LABELS: u32 = 100000;
/// Number of draws before giving up on finding a free context identifier
const MAX_CONTEXT_DRAWS: usize = 10_000;

lazy_static! {
    static ref CONTEXTS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Draw a context identifier `<node>-<NNN>` which is not used by any other instance.
fn allocate_context(node: &str) -> Result<String> {
    let mut contexts = CONTEXTS.lock().unwrap_or_else(|e| e.into_inner());
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_CONTEXT_DRAWS {
        let context = format!("{}-{:03}", node, rng.gen_range(0..=999));
        if contexts.insert(context.clone()) {
            return Ok(context);
        }
    }
    Err(Error::ContextIdExhausted(node.to_string()))
}

fn release_context(context: &str) {
    CONTEXTS.lock().unwrap_or_else(|e| e.into_inner()).remove(context);
}

#[cfg(test)]
fn context_allocated(context: &str) -> bool {
    CONTEXTS.lock().unwrap_or_else(|e| e.into_inner()).contains(context)
}

/// State of a routing instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Context allocated, nothing applied
    Unconfigured,
    /// Kernel settings applied, daemons not started
    Provisioning,
    /// Daemons are running
    Running,
    /// Being torn down
    Terminating,
    /// Torn down, the context identifier is released
    Terminated,
}

/// VRF together with the routing table it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfTable {
    /// The VRF
    pub vrf: Vrf,
    /// Kernel routing table id
    pub table: u32,
}

/// # Routing Instance
///
/// Owned handle of an FRRouting instance. All commands are executed through the shell of the
/// node, which is passed to every operation.
#[derive(Debug)]
pub struct RoutingInstance {
    node: String,
    context: String,
    daemons: DaemonSet,
    commands: Vec<String>,
    vrfs: Vec<VrfTable>,
    intfs: Vec<String>,
    state: RouterState,
}

impl RoutingInstance {
    /// Create the instance of a node, allocating its context identifier.
    pub fn new(node: impl Into<String>, attrs: &RouterAttrs) -> Result<Self> {
        let node = node.into();
        let context = allocate_context(&node)?;
        debug!("Context of {} is {}", node, context);
        let vrfs = attrs
            .vrfs
            .iter()
            .enumerate()
            .map(|(i, vrf)| VrfTable { vrf: vrf.clone(), table: i as u32 + 1 })
            .collect();
        Ok(Self {
            node,
            context,
            daemons: attrs.daemons.clone(),
            commands: attrs.commands.clone(),
            vrfs,
            intfs: Vec::new(),
            state: RouterState::Unconfigured,
        })
    }

    /// Name of the node
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Context identifier, naming the pathspace and the namespace link
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Current state
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Enabled daemons
    pub fn daemons(&self) -> &DaemonSet {
        &self.daemons
    }

    /// VRFs with their routing table
    pub fn vrfs(&self) -> &[VrfTable] {
        &self.vrfs
    }

    /// Returns true if the instance runs `ldpd`, and thus switches labels
    pub fn mpls_enabled(&self) -> bool {
        self.daemons.contains(&Daemon::Ldpd)
    }

    /// Pathspace of the instance
    pub fn pathspace(&self, paths: &FrrConfig) -> PathBuf {
        paths.base_pathspace.join(&self.context)
    }

    /// Named namespace link of the instance
    pub fn netns_link(&self, paths: &FrrConfig) -> PathBuf {
        paths.netns_run_dir.join(&self.context)
    }

    fn check_state(&self, allowed: &[RouterState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                node: self.node.clone(),
                state: format!("{:?}", self.state),
                operation,
            })
        }
    }

    fn step(&self, shell: &mut dyn Shell, step: &str, command: &str) -> Result<String> {
        shell.cmd_checked(command).map_err(|e| e.at_step(&self.node, step))
    }

    /// Apply the kernel settings of the router to the node: forwarding, MTU, VRFs and, with
    /// `ldpd`, MPLS label processing. `intfs` are the materialized interfaces of the node.
    pub fn provision(&mut self, shell: &mut dyn Shell, intfs: &[String]) -> Result<()> {
        self.check_state(&[RouterState::Unconfigured], "provision")?;
        self.state = RouterState::Provisioning;
        self.intfs = intfs.to_vec();
        debug!("Provisioning {}", self.node);

        self.step(shell, "enable forwarding", "sysctl net.ipv4.ip_forward=1")?;

        for intf in intfs {
            self.step(
                shell,
                "set mtu",
                &format!("ip link set dev {} mtu {}", intf, LABELED_MTU),
            )?;
        }

        for VrfTable { vrf, table } in self.vrfs.iter() {
            let step = format!("create vrf {}", vrf.name);
            self.step(
                shell,
                &step,
                &format!("ip link add {} type vrf table {}", vrf.name, table),
            )?;
            self.step(shell, &step, &format!("ip link set dev {} up", vrf.name))?;
            for intf in vrf.interfaces.iter() {
                self.step(
                    shell,
                    &step,
                    &format!("ip link set dev {} master {}", intf, vrf.name),
                )?;
            }
        }

        if self.mpls_enabled() {
            self.step(
                shell,
                "enable mpls",
                &format!("sysctl net.mpls.platform_labels={}", PLATFORM_LABELS),
            )?;
            self.step(shell, "enable mpls", "sysctl net.mpls.conf.lo.input=1")?;
            for intf in intfs {
                self.step(
                    shell,
                    "enable mpls",
                    &format!("sysctl net.mpls.conf.{}.input=1", intf),
                )?;
            }
        }

        Ok(())
    }

    /// Create the pathspace, start the daemons and apply the scripted command sequence.
    pub fn start(&mut self, shell: &mut dyn Shell, paths: &FrrConfig) -> Result<()> {
        self.check_state(&[RouterState::Provisioning], "start")?;
        info!("Starting FRRouting on {} ({})", self.node, self.context);

        self.create_pathspace(paths).map_err(|e| e.at_step(&self.node, "create pathspace"))?;
        self.link_netns(paths, shell.pid()).map_err(|e| e.at_step(&self.node, "link netns"))?;
        self.write_daemons(paths).map_err(|e| e.at_step(&self.node, "write daemons"))?;
        self.write_vtysh_conf(paths).map_err(|e| e.at_step(&self.node, "write vtysh.conf"))?;

        self.step(
            shell,
            "start daemons",
            &format!("{} start {}", paths.frrinit.display(), self.context),
        )?;
        self.state = RouterState::Running;

        let commands = self.commands.clone();
        self.vtysh(shell, paths, &commands).map_err(|e| e.at_step(&self.node, "apply commands"))
    }

    /// Send a command sequence to the running daemons, and save the configuration. An empty
    /// sequence sends nothing.
    pub fn vtysh<S: AsRef<str>>(
        &mut self,
        shell: &mut dyn Shell,
        paths: &FrrConfig,
        commands: &[S],
    ) -> Result<()> {
        self.check_state(&[RouterState::Running], "configure")?;
        if commands.is_empty() {
            return Ok(());
        }
        let command = self.vtysh_command(paths, commands);
        debug!("Configuring {}: {}", self.node, command);
        shell.cmd_checked(&command)?;
        Ok(())
    }

    /// Build the `vtysh` invocation for a command sequence.
    pub fn vtysh_command<S: AsRef<str>>(&self, paths: &FrrConfig, commands: &[S]) -> String {
        let args = commands
            .iter()
            .map(|c| c.as_ref())
            .chain(["end", "write integrated"])
            .map(|c| format!("-c {}", quote(c)))
            .join(" ");
        format!("{} --pathspace {} {}", paths.vtysh, self.context, args)
    }

    /// Stop the daemons and undo the kernel settings. Errors are logged, but never returned. VRF
    /// devices are not removed.
    pub fn terminate(&mut self, shell: &mut dyn Shell, paths: &FrrConfig) -> Result<()> {
        if self.state == RouterState::Unconfigured {
            release_context(&self.context);
            self.state = RouterState::Terminated;
            return Ok(());
        }
        self.check_state(&[RouterState::Provisioning, RouterState::Running], "terminate")?;
        self.state = RouterState::Terminating;
        info!("Stopping FRRouting on {} ({})", self.node, self.context);

        match find_context_processes(&paths.proc_root, &self.context) {
            Ok(pids) => {
                for pid in pids {
                    debug!("Killing process {} of {}", pid, self.context);
                    if unsafe { libc::kill(pid, libc::SIGKILL) } != 0 {
                        warn!(
                            "Cannot kill process {} of {}: {}",
                            pid,
                            self.context,
                            std::io::Error::last_os_error()
                        );
                    }
                }
            }
            Err(e) => warn!("Cannot list the processes of {}: {}", self.context, e),
        }

        let mut reset = vec![String::from("sysctl net.ipv4.ip_forward=0")];
        if self.mpls_enabled() {
            reset.push(String::from("sysctl net.mpls.platform_labels=0"));
            reset.push(String::from("sysctl net.mpls.conf.lo.input=0"));
            reset.extend(self.intfs.iter().map(|i| format!("sysctl net.mpls.conf.{}.input=0", i)));
        }
        for command in reset {
            if let Err(e) = shell.cmd_checked(&command) {
                warn!("Cannot reset {}: {}", self.node, e);
            }
        }

        if let Err(e) = fs::remove_file(self.netns_link(paths)) {
            warn!("Cannot remove the netns link of {}: {}", self.node, e);
        }
        if let Err(e) = fs::remove_dir_all(self.pathspace(paths)) {
            warn!("Cannot remove the pathspace of {}: {}", self.node, e);
        }

        release_context(&self.context);
        self.state = RouterState::Terminated;
        Ok(())
    }

    fn create_pathspace(&self, paths: &FrrConfig) -> Result<()> {
        let pathspace = self.pathspace(paths);
        fs::create_dir(&pathspace)?;
        for entry in fs::read_dir(&paths.base_pathspace)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::copy(entry.path(), pathspace.join(entry.file_name()))?;
            }
        }
        Ok(())
    }

    fn link_netns(&self, paths: &FrrConfig, pid: u32) -> Result<()> {
        fs::create_dir_all(&paths.netns_run_dir)?;
        let target = paths.proc_root.join(pid.to_string()).join("ns").join("net");
        std::os::unix::fs::symlink(target, self.netns_link(paths))?;
        Ok(())
    }

    fn write_daemons(&self, paths: &FrrConfig) -> Result<()> {
        let file = self.pathspace(paths).join("daemons");
        let content = fs::read_to_string(&file)?;
        let state = |d: Daemon| if self.daemons.contains(&d) { "yes" } else { "no" };
        let mut seen = HashSet::new();
        let mut lines: Vec<String> = content
            .lines()
            .map(|line| match line.split_once('=') {
                Some((key, _)) => match key.trim().parse::<Daemon>() {
                    Ok(d) => {
                        seen.insert(d);
                        format!("{}={}", d.name(), state(d))
                    }
                    Err(_) => line.to_string(),
                },
                None => line.to_string(),
            })
            .collect();
        lines.extend(
            Daemon::all()
                .iter()
                .filter(|d| !seen.contains(*d))
                .map(|d| format!("{}={}", d.name(), state(*d))),
        );
        lines.push(format!("watchfrr_options=\"--netns={}\"", self.context));
        fs::write(&file, lines.join("\n") + "\n")?;
        Ok(())
    }

    fn write_vtysh_conf(&self, paths: &FrrConfig) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.pathspace(paths).join("vtysh.conf"))?;
        writeln!(file, "hostname {}", self.node)?;
        Ok(())
    }
}

impl Drop for RoutingInstance {
    fn drop(&mut self) {
        release_context(&self.context);
    }
}

/// Find all processes started for the context identifier, except this one. A process belongs to
/// the context if one of its arguments, an option value (`--netns=<ctx>`) or a path component of
/// either is exactly the identifier.
pub fn find_context_processes(proc_root: &Path, context: &str) -> std::io::Result<Vec<i32>> {
    let own = std::process::id() as i32;
    let mut pids = Vec::new();
    for entry in fs::read_dir(proc_root)? {
        let entry = entry?;
        let pid: i32 = match entry.file_name().to_str().and_then(|n| n.parse().ok()) {
            Some(pid) => pid,
            None => continue,
        };
        if pid == own {
            continue;
        }
        // processes may exit while scanning
        let cmdline = match fs::read(entry.path().join("cmdline")) {
            Ok(cmdline) => cmdline,
            Err(_) => continue,
        };
        let cmdline = String::from_utf8_lossy(&cmdline);
        if cmdline.split('\0').any(|arg| names_context(arg, context)) {
            pids.push(pid);
        }
    }
    pids.sort_unstable();
    Ok(pids)
}

fn names_context(arg: &str, context: &str) -> bool {
    let value = match arg.split_once('=') {
        Some((option, value)) if option.starts_with('-') => value,
        _ => arg,
    };
    let value = value.trim_matches('"');
    !value.is_empty() && Path::new(value).components().any(|c| c.as_os_str() == context)
}

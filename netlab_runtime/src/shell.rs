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

//! # Node shells
//!
//! Every node of the fabric is a long-lived shell process, created by `unshare` with its own
//! network and mount namespace. Commands are written to the standard input of the shell, and each
//! one is followed by a sentinel line carrying its exit status, which frames the output.

use crate::{Error, Result};

use lazy_static::lazy_static;
use log::*;
use regex::Regex;

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

lazy_static! {
    static ref DONE_RE: Regex = Regex::new(r"^(.*)__NETLAB_DONE_(\d+)__ (-?\d+)$").unwrap();
}

/// Output of a command executed in a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    /// Combined standard output and standard error
    pub output: String,
    /// Exit status
    pub code: i32,
}

impl CmdOutput {
    /// Returns true if the command exited with status 0
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A shell executing commands inside a node.
pub trait Shell: std::fmt::Debug {
    /// Execute a command and wait for it to complete.
    fn cmd(&mut self, command: &str) -> Result<CmdOutput>;

    /// Execute a command, and return an error if its exit status is not 0.
    fn cmd_checked(&mut self, command: &str) -> Result<String> {
        let out = self.cmd(command)?;
        if out.success() {
            Ok(out.output)
        } else {
            Err(Error::Command { cmd: command.to_string(), code: out.code, output: out.output })
        }
    }

    /// Process id of the shell. Its namespaces are the ones of the node.
    fn pid(&self) -> u32;
}

/// Quote a string for the shell, using single quotes.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// # Node Shell
///
/// `sh` process in a fresh network and mount namespace. Mounts are private to the node. The
/// shell is killed when the struct is dropped.
pub struct NodeShell {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    counter: u64,
}

impl std::fmt::Debug for NodeShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeShell({}, pid {})", self.name, self.child.id())
    }
}

impl NodeShell {
    /// Spawn the shell of a node, using the given `unshare` binary.
    pub fn spawn(name: impl Into<String>, unshare: impl AsRef<Path>) -> Result<Self> {
        let mut command = Command::new(unshare.as_ref());
        command.args(["--net", "--mount", "--propagation", "private", "sh"]);
        Self::spawn_command(name.into(), command)
    }

    /// Spawn a shell in the namespaces of this process, used to manage the switches and links.
    pub fn spawn_host() -> Result<Self> {
        Self::spawn_command(String::from("host"), Command::new("sh"))
    }

    fn spawn_command(name: String, mut command: Command) -> Result<Self> {
        debug!("Spawning the shell of {}", name);
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| Error::ShellExited(name.clone()))?;
        let stdout = child.stdout.take().ok_or_else(|| Error::ShellExited(name.clone()))?;

        let mut shell = Self { name, child, stdin, stdout: BufReader::new(stdout), counter: 0 };
        // from now on, the output of every command contains its error messages
        shell.stdin.write_all(b"exec 2>&1\n")?;
        // `unshare` only execs the shell after entering the new namespaces, so once the shell
        // answers, its pid refers to the node's namespaces
        shell.cmd_checked("true")?;
        Ok(shell)
    }

    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Shell for NodeShell {
    fn cmd(&mut self, command: &str) -> Result<CmdOutput> {
        self.counter += 1;
        let id = self.counter.to_string();
        trace!("[{}] {}", self.name, command);

        let script = format!("{{ {}\n}} </dev/null\necho \"__NETLAB_DONE_{}__ $?\"\n", command, id);
        self.stdin.write_all(script.as_bytes())?;
        self.stdin.flush()?;

        let mut output = String::new();
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(Error::ShellExited(self.name.clone()));
            }
            if let Some(caps) = DONE_RE.captures(line.trim_end_matches('\n')) {
                if caps[2] == id {
                    output.push_str(&caps[1]);
                    let code = caps[3].parse().unwrap_or(-1);
                    trace!("[{}] exit {}: {}", self.name, code, output);
                    return Ok(CmdOutput { output, code });
                }
            }
            output.push_str(&line);
        }
    }

    fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for NodeShell {
    fn drop(&mut self) {
        debug!("Killing the shell of {}", self.name);
        if let Err(e) = self.child.kill() {
            warn!("Cannot kill the shell of {}: {}", self.name, e);
        }
        let _ = self.child.wait();
    }
}

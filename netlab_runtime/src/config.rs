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

//! # Lab configuration
//!
//! All paths and tunables of the runtime. Every field has a default reproducing a stock FRRouting
//! and ZeroTier installation, so a configuration file only needs to name what differs:
//!
//! ```json
//! {
//!     "frr": { "base_pathspace": "/usr/local/etc/frr" },
//!     "overlay": { "max_ping_attempts": 20 }
//! }
//! ```

use crate::{Error, Result};

use ipnet::Ipv4Net;
use log::*;
use serde::Deserialize;

use std::fs::File;
use std::io::BufReader;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Complete configuration of the runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// FRRouting installation
    pub frr: FrrConfig,
    /// Emulated fabric
    pub fabric: FabricConfig,
    /// ZeroTier agents
    pub overlay: OverlayConfig,
}

/// Paths of the FRRouting installation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrrConfig {
    /// Directory holding the template configuration (`daemons`, `vtysh.conf`, ...). The
    /// pathspace of every routing instance is created as a subdirectory.
    pub base_pathspace: PathBuf,
    /// Directory of named network namespaces, where `watchfrr` looks for `--netns`
    pub netns_run_dir: PathBuf,
    /// FRR init script
    pub frrinit: PathBuf,
    /// The `vtysh` binary
    pub vtysh: String,
    /// Mount point of procfs, scanned when killing the daemons of an instance
    pub proc_root: PathBuf,
}

impl Default for FrrConfig {
    fn default() -> Self {
        Self {
            base_pathspace: PathBuf::from("/etc/frr"),
            netns_run_dir: PathBuf::from("/var/run/netns"),
            frrinit: PathBuf::from("/usr/lib/frr/frrinit.sh"),
            vtysh: String::from("vtysh"),
            proc_root: PathBuf::from("/proc"),
        }
    }
}

/// Settings of the emulated fabric
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FabricConfig {
    /// Network from which nodes without explicit address are numbered
    pub ip_base: Ipv4Net,
    /// The `unshare` binary, used to spawn the node shells
    pub unshare: PathBuf,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            ip_base: Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8),
            unshare: PathBuf::from("unshare"),
        }
    }
}

/// Settings of the ZeroTier agents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Home folder of the agent, private to each node
    pub home: PathBuf,
    /// Port of the local HTTP API
    pub api_port: u16,
    /// Time to wait after starting the agent
    pub startup_wait_secs: u64,
    /// Step of the linear backoff while waiting for reachability
    pub backoff_step_secs: u64,
    /// Number of reachability checks before giving up
    pub max_ping_attempts: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("/var/lib/zerotier-one"),
            api_port: zerotier::DEFAULT_PORT,
            startup_wait_secs: 2,
            backoff_step_secs: 5,
            max_ping_attempts: 12,
        }
    }
}

impl LabConfig {
    /// Load the configuration from a JSON file. Missing fields keep their default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values which cannot work
    pub fn validate(&self) -> Result<()> {
        if self.overlay.max_ping_attempts == 0 {
            return Err(Error::Config("overlay.max_ping_attempts must be at least 1".to_string()));
        }
        if self.overlay.api_port == 0 {
            return Err(Error::Config("overlay.api_port must not be 0".to_string()));
        }
        if self.fabric.ip_base.prefix_len() > 30 {
            return Err(Error::Config(format!(
                "fabric.ip_base {} leaves no room for nodes",
                self.fabric.ip_base
            )));
        }
        if self.frr.vtysh.is_empty() {
            return Err(Error::Config("frr.vtysh must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = LabConfig::default();
        assert_eq!(config.frr.base_pathspace, PathBuf::from("/etc/frr"));
        assert_eq!(config.frr.netns_run_dir, PathBuf::from("/var/run/netns"));
        assert_eq!(config.frr.frrinit, PathBuf::from("/usr/lib/frr/frrinit.sh"));
        assert_eq!(config.fabric.ip_base.to_string(), "10.0.0.0/8");
        assert_eq!(config.overlay.api_port, 9993);
        assert_eq!(config.overlay.max_ping_attempts, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file() {
        let file = write_config(
            r#"{
                "frr": { "base_pathspace": "/usr/local/etc/frr" },
                "fabric": { "ip_base": "172.16.0.0/12" },
                "overlay": { "max_ping_attempts": 3 }
            }"#,
        );
        let config = LabConfig::load(file.path()).unwrap();
        assert_eq!(config.frr.base_pathspace, PathBuf::from("/usr/local/etc/frr"));
        assert_eq!(config.frr.vtysh, "vtysh");
        assert_eq!(config.fabric.ip_base.to_string(), "172.16.0.0/12");
        assert_eq!(config.overlay.max_ping_attempts, 3);
        assert_eq!(config.overlay.backoff_step_secs, 5);
    }

    #[test]
    fn empty_file() {
        let file = write_config("{}");
        assert_eq!(LabConfig::load(file.path()).unwrap(), LabConfig::default());
    }

    #[test]
    fn unknown_field() {
        let file = write_config(r#"{ "fabric": { "bandwidth": 10 } }"#);
        assert!(matches!(LabConfig::load(file.path()), Err(Error::Json(_))));
    }

    #[test]
    fn invalid_values() {
        let file = write_config(r#"{ "overlay": { "max_ping_attempts": 0 } }"#);
        assert!(matches!(LabConfig::load(file.path()), Err(Error::Config(_))));
        let file = write_config(r#"{ "fabric": { "ip_base": "10.0.0.0/31" } }"#);
        assert!(matches!(LabConfig::load(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(LabConfig::load("/nonexistent/netlab.json"), Err(Error::Io(_))));
    }
}

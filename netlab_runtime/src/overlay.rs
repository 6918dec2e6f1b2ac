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

//! # Overlay nodes
//!
//! Lifecycle of the ZeroTier agent running on a node, and access to its local API. The home
//! folder of the agent is a tmpfs private to the node, while the `moons.d` folder is shared
//! between all overlay nodes, so that the moon generated by the root is orbited by everyone.

use crate::config::OverlayConfig;
use crate::netns;
use crate::shell::{quote, Shell};
use crate::{Error, Result};
use netlab::topology::{Interface, NodeRole, TrustedPath};
use zerotier::{ControllerNetwork, Network, NetworkConfig, ServiceClient};

use log::*;
use serde_json::{json, Value};

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

/// Port on which ZeroTier agents talk to each other
pub const ZEROTIER_PORT: u16 = 9993;

/// Kind of overlay node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Generates the moon
    Root,
    /// Network controller
    Controller,
    /// Member of the network
    Leaf,
}

/// # Overlay Node
///
/// ZeroTier agent of a node. The node id and the API token are known once the agent was
/// configured.
#[derive(Debug)]
pub struct OverlayNode {
    node: String,
    kind: OverlayKind,
    trusted_paths: Vec<TrustedPath>,
    home: PathBuf,
    api_port: u16,
    startup_wait: Duration,
    node_id: Option<String>,
    auth_token: Option<String>,
    agent_pid: Option<u32>,
    networks: Vec<String>,
}

impl OverlayNode {
    /// Create the overlay node of a node, or `None` if the role does not run an agent.
    pub fn new(node: impl Into<String>, role: &NodeRole, config: &OverlayConfig) -> Option<Self> {
        let (kind, attrs) = match role {
            NodeRole::OverlayRoot(attrs) => (OverlayKind::Root, attrs),
            NodeRole::OverlayController(attrs) => (OverlayKind::Controller, attrs),
            NodeRole::OverlayLeaf(attrs) => (OverlayKind::Leaf, attrs),
            _ => return None,
        };
        Some(Self {
            node: node.into(),
            kind,
            trusted_paths: attrs.trusted_paths.clone(),
            home: config.home.clone(),
            api_port: config.api_port,
            startup_wait: Duration::from_secs(config.startup_wait_secs),
            node_id: None,
            auth_token: None,
            agent_pid: None,
            networks: Vec::new(),
        })
    }

    /// Name of the node
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Kind of the node
    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    /// ZeroTier node id, once configured
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// Token of the local API, once configured
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Process id of the running agent
    pub fn agent_pid(&self) -> Option<u32> {
        self.agent_pid
    }

    /// Networks joined so far, in join order
    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    fn path(&self, file: &str) -> String {
        self.home.join(file).display().to_string()
    }

    /// Write `local.conf`, start the agent and read its identity. The root additionally
    /// generates the moon from the addresses of `intfs`, and restarts.
    pub fn configure(&mut self, shell: &mut dyn Shell, intfs: &[Interface]) -> Result<()> {
        info!("Configuring ZeroTier on {}", self.node);
        if self.kind == OverlayKind::Root {
            shell
                .cmd_checked(&format!("rm -rf {}/*", self.path("moons.d")))
                .map_err(|e| e.at_step(&self.node, "clear moons"))?;
        }
        if let Some(local_conf) = self.local_conf() {
            shell
                .cmd_checked(&format!(
                    "printf '%s\\n' {} > {}",
                    quote(&local_conf),
                    self.path("local.conf")
                ))
                .map_err(|e| e.at_step(&self.node, "write local.conf"))?;
        }

        self.start(shell).map_err(|e| e.at_step(&self.node, "start agent"))?;

        let node_id = shell
            .cmd_checked("zerotier-cli info | cut -d ' ' -f 3")
            .map_err(|e| e.at_step(&self.node, "read node id"))?;
        self.node_id = Some(node_id.trim().to_string());
        let token = shell
            .cmd_checked(&format!("cat {}", self.path("authtoken.secret")))
            .map_err(|e| e.at_step(&self.node, "read auth token"))?;
        self.auth_token = Some(token.trim().to_string());
        debug!("ZeroTier node id of {} is {}", self.node, node_id.trim());

        if self.kind == OverlayKind::Root {
            self.generate_moon(shell, intfs).map_err(|e| e.at_step(&self.node, "generate moon"))?;
            self.restart(shell).map_err(|e| e.at_step(&self.node, "restart agent"))?;
        }
        Ok(())
    }

    /// Content of `local.conf`, if the node has trusted paths.
    pub fn local_conf(&self) -> Option<String> {
        if self.trusted_paths.is_empty() {
            return None;
        }
        let physical: serde_json::Map<String, Value> = self
            .trusted_paths
            .iter()
            .map(|p| (p.net.to_string(), json!({ "trustedPathId": p.id })))
            .collect();
        Some(json!({ "physical": physical }).to_string())
    }

    /// Start the agent and wait for it to come up.
    pub fn start(&mut self, shell: &mut dyn Shell) -> Result<()> {
        debug!("Starting the ZeroTier agent of {}", self.node);
        shell.cmd_checked("zerotier-one -d")?;
        sleep(self.startup_wait);
        // the first call may fail while the agent generates its identity
        shell.cmd("zerotier-cli info")?;
        self.agent_pid = Some(self.read_pid(shell)?);
        Ok(())
    }

    /// Kill the agent.
    pub fn stop(&mut self, shell: &mut dyn Shell) -> Result<()> {
        let pid = match self.agent_pid {
            Some(pid) => pid,
            None => self.read_pid(shell)?,
        };
        debug!("Stopping the ZeroTier agent of {} (pid {})", self.node, pid);
        shell.cmd_checked(&format!("kill -KILL {}", pid))?;
        self.agent_pid = None;
        Ok(())
    }

    /// Stop and start the agent, such that it picks up new moons.
    pub fn restart(&mut self, shell: &mut dyn Shell) -> Result<()> {
        self.stop(shell)?;
        self.start(shell)
    }

    fn read_pid(&self, shell: &mut dyn Shell) -> Result<u32> {
        let out = shell.cmd_checked(&format!("cat {}", self.path("zerotier-one.pid")))?;
        out.trim().parse().map_err(|_| {
            let msg = format!("invalid pid file of {}: {:?}", self.node, out.trim());
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
        })
    }

    fn generate_moon(&self, shell: &mut dyn Shell, intfs: &[Interface]) -> Result<()> {
        let moon_json = self.path("moon.json");
        shell.cmd_checked(&format!(
            "zerotier-idtool initmoon {} > {}",
            self.path("identity.public"),
            moon_json
        ))?;
        let moon = shell.cmd_checked(&format!("cat {}", moon_json))?;
        let moon = with_stable_endpoints(&moon, intfs)?;
        shell.cmd_checked(&format!("printf '%s\\n' {} > {}", quote(&moon), moon_json))?;
        shell.cmd_checked(&format!(
            "(cd {} && zerotier-idtool genmoon {})",
            self.path("moons.d"),
            moon_json
        ))?;
        Ok(())
    }

    fn client(&self) -> Result<ServiceClient> {
        match &self.auth_token {
            Some(token) => Ok(ServiceClient::local(self.api_port, token.as_str())),
            None => Err(Error::InvalidState {
                node: self.node.clone(),
                state: String::from("unconfigured"),
                operation: "call the API of",
            }),
        }
    }

    /// Call the local API of the agent from inside the network namespace of the node, given by
    /// the pid of any of its processes.
    pub fn call_api<T, F>(&self, pid: u32, f: F) -> Result<T>
    where
        F: FnOnce(&ServiceClient) -> std::result::Result<T, zerotier::Error>,
    {
        let client = self.client()?;
        netns::run_in_node_context(pid, || f(&client))?
            .map_err(|source| Error::OverlayApi { node: self.node.clone(), source })
    }

    /// Create a network on this controller, managing the /24 of `net_addr`.
    pub fn create_network(&self, pid: u32, net_addr: Ipv4Addr) -> Result<ControllerNetwork> {
        let controller_id = self.node_id.clone().ok_or_else(|| Error::InvalidState {
            node: self.node.clone(),
            state: String::from("unconfigured"),
            operation: "create a network on",
        })?;
        let config = NetworkConfig::for_subnet(net_addr);
        self.call_api(pid, |c| c.create_network(&controller_id, &config))
    }

    /// Ids of the networks managed by this controller
    pub fn get_networks(&self, pid: u32) -> Result<Vec<String>> {
        self.call_api(pid, |c| c.get_networks())
    }

    /// Join a network
    pub fn join_network(&mut self, pid: u32, network_id: &str) -> Result<Network> {
        let network = self.call_api(pid, |c| c.join_network(network_id))?;
        self.networks.push(network_id.to_string());
        Ok(network)
    }

    /// Home folder of the agent
    pub fn home(&self) -> &Path {
        &self.home
    }
}

/// Set the stable endpoints of the moon definition to `<ip>/9993` for every interface with an
/// address.
pub fn with_stable_endpoints(moon: &str, intfs: &[Interface]) -> Result<String> {
    let mut moon: Value = serde_json::from_str(moon)?;
    let endpoints: Vec<Value> = intfs
        .iter()
        .filter_map(|i| i.ip)
        .map(|ip| Value::from(format!("{}/{}", ip.addr(), ZEROTIER_PORT)))
        .collect();
    match moon.pointer_mut("/roots/0") {
        Some(Value::Object(root)) => {
            root.insert(String::from("stableEndpoints"), Value::Array(endpoints));
        }
        _ => return Err(Error::Config(String::from("moon definition without roots"))),
    }
    Ok(serde_json::to_string_pretty(&moon)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shell::test::MockShell;
    use ipnet::Ipv4Net;
    use netlab::topology::OverlayAttrs;
    use pretty_assertions::assert_eq;

    const MOON: &str = r#"{
        "id": "deadbeef00",
        "objtype": "world",
        "roots": [{ "identity": "deadbeef00:0:abcd", "stableEndpoints": [] }],
        "signingKey": "aa",
        "updatesMustBeSignedBy": "aa",
        "worldType": "moon"
    }"#;

    fn config() -> OverlayConfig {
        OverlayConfig { startup_wait_secs: 0, ..Default::default() }
    }

    fn agent_shell() -> MockShell {
        MockShell::new()
            .respond("zerotier-cli info | cut", "deadbeef00\n")
            .respond("authtoken.secret", "secret-token\n")
            .respond("zerotier-one.pid", "777\n")
            .respond("cat /var/lib/zerotier-one/moon.json", MOON)
    }

    fn intf(name: &str, ip: Option<&str>) -> Interface {
        Interface {
            name: name.to_string(),
            port: 0,
            ip: ip.map(|ip| ip.parse::<Ipv4Net>().unwrap()),
            link: netlab::topology::LinkId::new(0),
        }
    }

    #[test]
    fn roles() {
        let attrs = OverlayAttrs::default();
        assert_eq!(
            OverlayNode::new("r", &NodeRole::OverlayRoot(attrs.clone()), &config()).unwrap().kind(),
            OverlayKind::Root
        );
        assert_eq!(
            OverlayNode::new("h", &NodeRole::OverlayLeaf(attrs), &config()).unwrap().kind(),
            OverlayKind::Leaf
        );
        assert!(OverlayNode::new("h", &NodeRole::Host, &config()).is_none());
    }

    #[test]
    fn configure_leaf() {
        let role = NodeRole::OverlayLeaf(OverlayAttrs::default());
        let mut node = OverlayNode::new("h1", &role, &config()).unwrap();
        let mut shell = agent_shell();
        node.configure(&mut shell, &[intf("h1-eth0", Some("10.0.0.3/8"))]).unwrap();
        assert_eq!(node.node_id(), Some("deadbeef00"));
        assert_eq!(node.auth_token(), Some("secret-token"));
        assert_eq!(node.agent_pid(), Some(777));
        assert_eq!(
            shell.commands,
            vec![
                "zerotier-one -d",
                "zerotier-cli info",
                "cat /var/lib/zerotier-one/zerotier-one.pid",
                "zerotier-cli info | cut -d ' ' -f 3",
                "cat /var/lib/zerotier-one/authtoken.secret",
            ]
        );
    }

    #[test]
    fn configure_root() {
        let role = NodeRole::OverlayRoot(OverlayAttrs::default());
        let mut node = OverlayNode::new("root", &role, &config()).unwrap();
        let mut shell = agent_shell();
        let intfs =
            [intf("root-eth0", Some("10.0.0.1/8")), intf("root-eth1", Some("10.1.0.1/16"))];
        node.configure(&mut shell, &intfs).unwrap();

        assert_eq!(shell.commands[0], "rm -rf /var/lib/zerotier-one/moons.d/*");
        assert!(shell.commands.contains(&String::from(
            "zerotier-idtool initmoon /var/lib/zerotier-one/identity.public > \
             /var/lib/zerotier-one/moon.json"
        )));
        let write = shell
            .commands
            .iter()
            .find(|c| c.starts_with("printf") && c.ends_with("moon.json"))
            .unwrap();
        assert!(write.contains(r#""10.0.0.1/9993""#));
        assert!(write.contains(r#""10.1.0.1/9993""#));
        assert!(shell.commands.contains(&String::from(
            "(cd /var/lib/zerotier-one/moons.d && zerotier-idtool genmoon \
             /var/lib/zerotier-one/moon.json)"
        )));
        // restarted after generating the moon
        assert_eq!(shell.commands.iter().filter(|c| *c == "zerotier-one -d").count(), 2);
        assert!(shell.commands.contains(&String::from("kill -KILL 777")));
    }

    #[test]
    fn trusted_paths() {
        let attrs = OverlayAttrs {
            trusted_paths: vec![TrustedPath { net: "10.0.0.0/8".parse().unwrap(), id: 101 }],
        };
        let role = NodeRole::OverlayController(attrs);
        let mut node = OverlayNode::new("controller", &role, &config()).unwrap();
        let local_conf: Value = serde_json::from_str(&node.local_conf().unwrap()).unwrap();
        assert_eq!(local_conf, json!({ "physical": { "10.0.0.0/8": { "trustedPathId": 101 } } }));

        let mut shell = agent_shell();
        node.configure(&mut shell, &[]).unwrap();
        assert!(shell.commands[0].ends_with("> /var/lib/zerotier-one/local.conf"));
        assert!(shell.commands[0].contains("trustedPathId"));

        let leaf = OverlayNode::new("h1", &NodeRole::OverlayLeaf(Default::default()), &config());
        assert_eq!(leaf.unwrap().local_conf(), None);
    }

    #[test]
    fn stable_endpoints() {
        let intfs = [intf("r-eth0", Some("10.0.0.1/8")), intf("r-eth1", None)];
        let moon = with_stable_endpoints(MOON, &intfs).unwrap();
        let moon: Value = serde_json::from_str(&moon).unwrap();
        assert_eq!(moon["roots"][0]["stableEndpoints"], json!(["10.0.0.1/9993"]));
        assert_eq!(moon["roots"][0]["identity"], json!("deadbeef00:0:abcd"));
        assert!(with_stable_endpoints(r#"{ "roots": [] }"#, &intfs).is_err());
        assert!(with_stable_endpoints("not json", &intfs).is_err());
    }

    #[test]
    fn failing_agent() {
        let role = NodeRole::OverlayLeaf(OverlayAttrs::default());
        let mut node = OverlayNode::new("h2", &role, &config()).unwrap();
        let mut shell = agent_shell().fail_on("zerotier-one -d");
        match node.configure(&mut shell, &[]) {
            Err(Error::Provisioning { node, step, .. }) => {
                assert_eq!(node, "h2");
                assert_eq!(step, "start agent");
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn api_requires_configuration() {
        let role = NodeRole::OverlayController(OverlayAttrs::default());
        let node = OverlayNode::new("controller", &role, &config()).unwrap();
        assert!(matches!(node.get_networks(1), Err(Error::InvalidState { .. })));
        assert!(matches!(
            node.create_network(1, Ipv4Addr::new(192, 168, 0, 0)),
            Err(Error::InvalidState { .. })
        ));
    }
}

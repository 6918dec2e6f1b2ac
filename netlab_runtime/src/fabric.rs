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

//! # Fabric
//!
//! The live lab: one shell per node (each in its own network and mount namespace), Linux bridges
//! in the root namespace for the switches, and veth pairs for the links. Building the fabric
//! configures every node in insertion order: interfaces and routes first, then the routing
//! instance or the ZeroTier agent, depending on the role of the node.
//!
//! The fabric is stopped when it is dropped. Stopping is best-effort, and never fails.

use crate::config::{FrrConfig, LabConfig};
use crate::frrouter::RoutingInstance;
use crate::overlay::OverlayNode;
use crate::post_config;
use crate::shell::{quote, CmdOutput, NodeShell, Shell};
use crate::{Error, Result};
use netlab::topology::{Interface, LinkEndpoint, NodeRole, NodeSpec, PrivateDir};
use netlab::{PostAction, Topology, TopologyGraph};
use zerotier::{ControllerNetwork, Network};

use ipnet::Ipv4Net;
use log::*;

use std::net::Ipv4Addr;
use std::path::Path;

/// Role specific part of a node
#[derive(Debug)]
pub enum NodeKind {
    /// Plain host
    Host,
    /// FRRouting router
    Router(RoutingInstance),
    /// ZeroTier node
    Overlay(OverlayNode),
}

/// # Node
///
/// A node of the fabric, with its shell and its materialized interfaces.
#[derive(Debug)]
pub struct Node {
    spec: NodeSpec,
    intfs: Vec<Interface>,
    shell: Box<dyn Shell>,
    kind: NodeKind,
}

impl Node {
    /// Name of the node
    pub fn name(&self) -> &str {
        self.spec.name()
    }

    /// Specification of the node
    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    /// Interfaces, ordered by port number
    pub fn intfs(&self) -> &[Interface] {
        &self.intfs
    }

    /// Names of the interfaces, ordered by port number
    pub fn intf_names(&self) -> Vec<String> {
        self.intfs.iter().map(|i| i.name.clone()).collect()
    }

    /// Default interface, which is the first one
    pub fn default_intf(&self) -> Option<&Interface> {
        self.intfs.first()
    }

    /// Address of the node, which is the one of its default interface
    pub fn ip(&self) -> Option<Ipv4Net> {
        self.default_intf().and_then(|i| i.ip).or_else(|| self.spec.ip())
    }

    /// Process id of the shell of the node
    pub fn pid(&self) -> u32 {
        self.shell.pid()
    }

    /// Role specific part
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The routing instance, if the node is a router
    pub fn router(&self) -> Option<&RoutingInstance> {
        match &self.kind {
            NodeKind::Router(r) => Some(r),
            _ => None,
        }
    }

    /// The ZeroTier agent, if the node runs one
    pub fn overlay(&self) -> Option<&OverlayNode> {
        match &self.kind {
            NodeKind::Overlay(o) => Some(o),
            _ => None,
        }
    }

    /// Execute a command inside the node
    pub fn cmd(&mut self, command: &str) -> Result<CmdOutput> {
        self.shell.cmd(command)
    }

    /// Execute a command inside the node, failing on a non-zero exit status
    pub fn cmd_checked(&mut self, command: &str) -> Result<String> {
        self.shell.cmd_checked(command)
    }

    /// Run `f` on this thread, switched into the network namespace of the node
    pub fn run_in_context<T, F: FnOnce() -> T>(&self, f: F) -> Result<T> {
        crate::netns::run_in_node_context(self.shell.pid(), f)
    }

    /// Send a command sequence to the routing daemons of the node
    pub fn vtysh<S: AsRef<str>>(&mut self, paths: &FrrConfig, commands: &[S]) -> Result<()> {
        match &mut self.kind {
            NodeKind::Router(r) => r.vtysh(self.shell.as_mut(), paths, commands),
            _ => Err(self.wrong_role("router")),
        }
    }

    /// Restart the ZeroTier agent of the node
    pub fn restart_overlay(&mut self) -> Result<()> {
        info!("Restarting the ZeroTier agent of {}", self.name());
        match &mut self.kind {
            NodeKind::Overlay(o) => o.restart(self.shell.as_mut()),
            _ => Err(self.wrong_role("ZeroTier node")),
        }
    }

    /// Create a network on the ZeroTier controller of this node
    pub fn create_network(&self, net_addr: Ipv4Addr) -> Result<ControllerNetwork> {
        match &self.kind {
            NodeKind::Overlay(o) => o.create_network(self.shell.pid(), net_addr),
            _ => Err(self.wrong_role("ZeroTier node")),
        }
    }

    /// Networks managed by the ZeroTier controller of this node
    pub fn get_networks(&self) -> Result<Vec<String>> {
        match &self.kind {
            NodeKind::Overlay(o) => o.get_networks(self.shell.pid()),
            _ => Err(self.wrong_role("ZeroTier node")),
        }
    }

    /// Join a ZeroTier network
    pub fn join_network(&mut self, network_id: &str) -> Result<Network> {
        let pid = self.shell.pid();
        match &mut self.kind {
            NodeKind::Overlay(o) => o.join_network(pid, network_id),
            _ => Err(self.wrong_role("ZeroTier node")),
        }
    }

    fn wrong_role(&self, expected: &'static str) -> Error {
        Error::WrongRole { node: self.name().to_string(), expected }
    }

    fn configure(&mut self, config: &LabConfig) -> Result<()> {
        let name = self.name().to_string();
        self.configure_base(config).map_err(|e| e.at_step(&name, "configure node"))?;
        let intf_names = self.intf_names();
        match &mut self.kind {
            NodeKind::Host => Ok(()),
            NodeKind::Router(r) => {
                r.provision(self.shell.as_mut(), &intf_names)?;
                r.start(self.shell.as_mut(), &config.frr)
            }
            NodeKind::Overlay(o) => o.configure(self.shell.as_mut(), &self.intfs),
        }
    }

    fn configure_base(&mut self, config: &LabConfig) -> Result<()> {
        self.shell.cmd_checked("ip link set lo up")?;

        let mut dirs = Vec::new();
        if matches!(self.kind, NodeKind::Overlay(_)) {
            dirs.push(PrivateDir::Tmpfs(config.overlay.home.clone()));
        }
        dirs.extend(self.spec.private_dirs().iter().cloned());
        for dir in dirs.iter() {
            self.shell.cmd_checked(&mount_command(dir))?;
        }

        for intf in self.intfs.iter() {
            if let Some(ip) = intf.ip {
                self.shell.cmd_checked(&format!("ip addr add {} dev {}", ip, intf.name))?;
            }
            self.shell.cmd_checked(&format!("ip link set dev {} up", intf.name))?;
        }

        if let Some(via) = self.spec.default_route() {
            self.shell.cmd_checked(&format!("ip route add default via {}", via))?;
        }
        Ok(())
    }

    fn stop(&mut self, config: &LabConfig) {
        match &mut self.kind {
            NodeKind::Host => {}
            NodeKind::Router(r) => {
                if let Err(e) = r.terminate(self.shell.as_mut(), &config.frr) {
                    warn!("Cannot terminate the routing instance of {}: {}", self.spec.name(), e);
                }
            }
            NodeKind::Overlay(o) => {
                if o.agent_pid().is_some() {
                    if let Err(e) = o.stop(self.shell.as_mut()) {
                        warn!("Cannot stop the ZeroTier agent of {}: {}", self.spec.name(), e);
                    }
                }
            }
        }
    }
}

fn path_arg(path: &Path) -> String {
    quote(&path.display().to_string())
}

/// Command mounting a private directory inside a node.
fn mount_command(dir: &PrivateDir) -> String {
    match dir {
        PrivateDir::Tmpfs(mount_point) => {
            let mount_point = path_arg(mount_point);
            format!("mkdir -p {0} && mount -t tmpfs tmpfs {0}", mount_point)
        }
        PrivateDir::Bind { mount_point, source } => {
            let (mount_point, source) = (path_arg(mount_point), path_arg(source));
            format!("mkdir -p {0} {1} && mount --bind {0} {1}", source, mount_point)
        }
    }
}

/// Command limiting the rate of an interface.
fn shape_command(intf: &str, bandwidth_mbit: u32) -> String {
    format!(
        "tc qdisc replace dev {} root tbf rate {}mbit burst 256kb latency 50ms",
        intf, bandwidth_mbit
    )
}

/// # Fabric
///
/// Materialized topology. See the [module documentation](self).
#[derive(Debug)]
pub struct Fabric {
    graph: TopologyGraph,
    post_actions: Vec<PostAction>,
    config: LabConfig,
    host: Box<dyn Shell>,
    nodes: Vec<Node>,
    bridges: Vec<String>,
    bridge_ports: Vec<String>,
    started: bool,
    post_configured: bool,
    stopped: bool,
}

impl Fabric {
    /// Materialize the topology. Nodes without an address are numbered from the IP base of the
    /// configuration.
    pub fn build(topology: Topology, config: &LabConfig) -> Result<Self> {
        let host = NodeShell::spawn_host()?;
        let unshare = config.fabric.unshare.clone();
        Self::build_with(topology, config, Box::new(host), |name| {
            Ok(Box::new(NodeShell::spawn(name, &unshare)?) as Box<dyn Shell>)
        })
    }

    /// Materialize the topology, using `host` for commands in the root namespace, and `spawn` to
    /// create the shell of every node.
    pub fn build_with<F>(
        topology: Topology,
        config: &LabConfig,
        host: Box<dyn Shell>,
        spawn: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Box<dyn Shell>>,
    {
        let Topology { mut graph, post_actions } = topology;
        graph.assign_addresses(config.fabric.ip_base);

        info!("*** Creating network");
        // on failure, dropping the fabric removes what was created so far
        let mut fabric = Self {
            graph,
            post_actions,
            config: config.clone(),
            host,
            nodes: Vec::new(),
            bridges: Vec::new(),
            bridge_ports: Vec::new(),
            started: false,
            post_configured: false,
            stopped: false,
        };
        fabric.create_nodes(spawn)?;
        fabric.create_bridges()?;
        fabric.create_links()?;
        fabric.configure_nodes()?;
        Ok(fabric)
    }

    fn create_nodes<F>(&mut self, mut spawn: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<Box<dyn Shell>>,
    {
        let names = self.graph.nodes_where(|n| !n.role().is_switch());
        info!("*** Adding nodes: {}", names.join(" "));
        for name in names {
            let spec = self.graph.node(&name)?.clone();
            let intfs = self.graph.interfaces(&name)?;
            let kind = match spec.role() {
                NodeRole::Router(attrs) => NodeKind::Router(RoutingInstance::new(&name, attrs)?),
                role => match OverlayNode::new(&name, role, &self.config.overlay) {
                    Some(overlay) => NodeKind::Overlay(overlay),
                    None => NodeKind::Host,
                },
            };
            let shell = spawn(&name)?;
            self.nodes.push(Node { spec, intfs, shell, kind });
        }
        Ok(())
    }

    fn create_bridges(&mut self) -> Result<()> {
        let switches: Vec<(String, bool)> = self
            .graph
            .nodes()
            .into_iter()
            .filter_map(|name| match self.graph.node(&name).map(|n| n.role()) {
                Ok(NodeRole::Switch(attrs)) => Some((name, attrs.stp)),
                _ => None,
            })
            .collect();
        info!(
            "*** Adding switches: {}",
            switches.iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>().join(" ")
        );
        for (name, stp) in switches {
            // leftover of an earlier run
            self.host.cmd(&format!("ip link del {}", name))?;
            self.host.cmd_checked(&format!("ip link add name {} type bridge", name))?;
            self.bridges.push(name.clone());
            if stp {
                self.host
                    .cmd_checked(&format!("ip link set dev {} type bridge stp_state 1", name))?;
            }
        }
        Ok(())
    }

    fn create_links(&mut self) -> Result<()> {
        let links: Vec<([LinkEndpoint; 2], u32)> = self
            .graph
            .links()
            .into_iter()
            .map(|l| (l.endpoints().clone(), l.bandwidth_mbit()))
            .collect();
        info!("*** Adding {} links", links.len());
        for ([a, b], bandwidth) in links {
            let (a_name, b_name) = (a.intf_name(), b.intf_name());
            debug!("Link {} <-> {}", a_name, b_name);
            self.host.cmd(&format!("ip link del {}", a_name))?;
            self.host
                .cmd_checked(&format!("ip link add {} type veth peer name {}", a_name, b_name))?;
            self.attach(&a, &a_name, bandwidth)?;
            self.attach(&b, &b_name, bandwidth)?;
        }
        Ok(())
    }

    /// Attach one end of a veth pair to its node, or to its bridge.
    fn attach(&mut self, endpoint: &LinkEndpoint, intf: &str, bandwidth: u32) -> Result<()> {
        let node_name = endpoint.node_name();
        if self.bridges.iter().any(|b| b == node_name) {
            self.host.cmd_checked(&format!("ip link set dev {} master {}", intf, node_name))?;
            self.host.cmd_checked(&format!("ip link set dev {} up", intf))?;
            self.host.cmd_checked(&shape_command(intf, bandwidth))?;
            self.bridge_ports.push(intf.to_string());
        } else {
            let idx = self.index(node_name)?;
            let pid = self.nodes[idx].pid();
            self.host.cmd_checked(&format!("ip link set dev {} netns {}", intf, pid))?;
            self.nodes[idx].cmd_checked(&shape_command(intf, bandwidth))?;
        }
        Ok(())
    }

    fn configure_nodes(&mut self) -> Result<()> {
        info!("*** Configuring nodes");
        for node in self.nodes.iter_mut() {
            node.configure(&self.config)?;
        }
        Ok(())
    }

    /// Bring up the switches. The fabric can only be post-configured once it is started.
    pub fn start(&mut self) -> Result<()> {
        info!("*** Starting {} switches", self.bridges.len());
        for bridge in self.bridges.iter() {
            self.host.cmd_checked(&format!("ip link set dev {} up", bridge))?;
        }
        self.started = true;
        Ok(())
    }

    /// Run the post actions of the topology. This can only be done once, after the fabric was
    /// started.
    pub fn post_configure(&mut self) -> Result<()> {
        if !self.started {
            return Err(Error::NotStarted);
        }
        if self.post_configured {
            return Err(Error::AlreadyPostConfigured);
        }
        self.post_configured = true;
        let actions = self.post_actions.clone();
        post_config::run(self, &actions)
    }

    /// Ping from every node to every other node, and return the number of failed pings. Nodes
    /// without address are not pinged.
    pub fn ping_all(&mut self) -> Result<usize> {
        info!("*** Ping: testing ping reachability");
        let targets: Vec<(String, Option<Ipv4Addr>)> = self
            .nodes
            .iter()
            .map(|n| (n.name().to_string(), n.ip().map(|ip| ip.addr())))
            .collect();
        let mut sent = 0;
        let mut lost = 0;
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let mut line = format!("{} ->", node.name());
            for (j, (name, ip)) in targets.iter().enumerate() {
                let ip = match ip {
                    Some(ip) if i != j => ip,
                    _ => continue,
                };
                sent += 1;
                if node.cmd(&format!("ping -c1 -W1 {}", ip))?.success() {
                    line.push(' ');
                    line.push_str(name);
                } else {
                    lost += 1;
                    line.push_str(" X");
                }
            }
            info!("{}", line);
        }
        if sent > 0 {
            info!(
                "*** Results: {}% dropped ({}/{} received)",
                lost * 100 / sent,
                sent - lost,
                sent
            );
        }
        Ok(lost)
    }

    /// Stop all nodes and remove the switches. Errors are logged, and otherwise ignored.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("*** Stopping {} nodes", self.nodes.len());
        for node in self.nodes.iter_mut() {
            node.stop(&self.config);
        }
        // killing the shells removes the namespaces, and with them the veth pairs
        self.nodes.clear();
        for port in self.bridge_ports.iter() {
            // usually gone together with its peer
            if let Err(e) = self.host.cmd(&format!("ip link del {}", port)) {
                warn!("Cannot remove {}: {}", port, e);
            }
        }
        info!("*** Stopping {} switches", self.bridges.len());
        for bridge in self.bridges.iter() {
            if let Err(e) = self.host.cmd_checked(&format!("ip link del {}", bridge)) {
                warn!("Cannot remove the bridge {}: {}", bridge, e);
            }
        }
        info!("*** Done");
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.nodes
            .iter()
            .position(|n| n.name() == name)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    /// Node by name. Switches are not nodes of the fabric.
    pub fn node(&self, name: &str) -> Result<&Node> {
        Ok(&self.nodes[self.index(name)?])
    }

    /// Mutable node by name
    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        let idx = self.index(name)?;
        Ok(&mut self.nodes[idx])
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Send a command sequence to the routing daemons of a node
    pub fn vtysh<S: AsRef<str>>(&mut self, name: &str, commands: &[S]) -> Result<()> {
        let idx = self.index(name)?;
        self.nodes[idx].vtysh(&self.config.frr, commands)
    }

    /// The topology, with the addresses assigned while building
    pub fn topology(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Post actions of the topology
    pub fn post_actions(&self) -> &[PostAction] {
        &self.post_actions
    }

    /// Configuration of the runtime
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    /// Returns true once the fabric is started
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Fabric {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frrouter::RouterState;
    use crate::shell::test::MockShell;
    use netlab::topology::{Daemon, LinkOptions, OverlayAttrs, RouterAttrs};
    use netlab::topos::builder::build_router_and_host;
    use netlab::topos::{MplsTopo, Scenario};
    use pretty_assertions::assert_eq;

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Mock shell which stays inspectable after being moved into the fabric
    #[derive(Debug, Clone)]
    struct SharedShell(Rc<RefCell<MockShell>>);

    impl Shell for SharedShell {
        fn cmd(&mut self, command: &str) -> Result<CmdOutput> {
            self.0.borrow_mut().cmd(command)
        }

        fn pid(&self) -> u32 {
            self.0.borrow().pid
        }
    }

    struct Lab {
        fabric: Result<Fabric>,
        host: Rc<RefCell<MockShell>>,
        shells: HashMap<String, Rc<RefCell<MockShell>>>,
        config: LabConfig,
        _dir: tempfile::TempDir,
    }

    impl Lab {
        fn commands(&self, node: &str) -> Vec<String> {
            self.shells[node].borrow().commands.clone()
        }

        fn host_commands(&self) -> Vec<String> {
            self.host.borrow().commands.clone()
        }

        fn fabric(&mut self) -> &mut Fabric {
            self.fabric.as_mut().unwrap()
        }
    }

    fn lab_config(dir: &Path) -> LabConfig {
        let base = dir.join("frr");
        fs::create_dir(&base).unwrap();
        fs::write(base.join("daemons"), "ospfd=no\nldpd=no\n").unwrap();
        fs::write(base.join("vtysh.conf"), "").unwrap();
        fs::create_dir(dir.join("proc")).unwrap();
        let mut config = LabConfig::default();
        config.frr.base_pathspace = base;
        config.frr.netns_run_dir = dir.join("netns");
        config.frr.proc_root = dir.join("proc");
        config.overlay.startup_wait_secs = 0;
        config.overlay.backoff_step_secs = 0;
        config
    }

    fn try_build(topology: Topology, setup: impl Fn(&str, MockShell) -> MockShell) -> Lab {
        let dir = tempfile::tempdir().unwrap();
        let config = lab_config(dir.path());
        let host = Rc::new(RefCell::new(MockShell::new()));
        let mut shells = HashMap::new();
        let mut pid = 100;
        let fabric = Fabric::build_with(
            topology,
            &config,
            Box::new(SharedShell(host.clone())),
            |name| {
                pid += 1;
                let mock = MockShell { pid, ..MockShell::new() };
                let shell = Rc::new(RefCell::new(setup(name, mock)));
                shells.insert(name.to_string(), shell.clone());
                Ok(Box::new(SharedShell(shell)) as Box<dyn Shell>)
            },
        );
        Lab { fabric, host, shells, config, _dir: dir }
    }

    fn build(topology: Topology) -> Lab {
        let lab = try_build(topology, |_, shell| shell);
        assert!(lab.fabric.is_ok(), "{:?}", lab.fabric.as_ref().err());
        lab
    }

    fn switched_hosts() -> Topology {
        let mut g = TopologyGraph::new();
        g.add_host("h1", None, None).unwrap();
        g.add_host("h2", None, None).unwrap();
        g.add_switch("s1", true).unwrap();
        g.add_link("h1", "s1", LinkOptions { bandwidth_mbit: Some(10) }).unwrap();
        g.add_link("h2", "s1", LinkOptions::default()).unwrap();
        Topology::new(g)
    }

    fn shape(intf: &str) -> String {
        format!("tc qdisc replace dev {} root tbf rate 1000mbit burst 256kb latency 50ms", intf)
    }

    #[test]
    fn materialize_switched_hosts() {
        let lab = build(switched_hosts());
        assert_eq!(
            lab.host_commands(),
            vec![
                String::from("ip link del s1"),
                String::from("ip link add name s1 type bridge"),
                String::from("ip link set dev s1 type bridge stp_state 1"),
                String::from("ip link del h1-eth0"),
                String::from("ip link add h1-eth0 type veth peer name s1-eth1"),
                String::from("ip link set dev h1-eth0 netns 101"),
                String::from("ip link set dev s1-eth1 master s1"),
                String::from("ip link set dev s1-eth1 up"),
                shape("s1-eth1"),
                String::from("ip link del h2-eth0"),
                String::from("ip link add h2-eth0 type veth peer name s1-eth2"),
                String::from("ip link set dev h2-eth0 netns 102"),
                String::from("ip link set dev s1-eth2 master s1"),
                String::from("ip link set dev s1-eth2 up"),
                shape("s1-eth2"),
            ]
        );
        assert_eq!(
            lab.commands("h1"),
            vec![
                shape("h1-eth0"),
                String::from("ip link set lo up"),
                String::from("ip addr add 10.0.0.1/8 dev h1-eth0"),
                String::from("ip link set dev h1-eth0 up"),
            ]
        );
        assert!(lab.commands("h2").contains(&String::from("ip addr add 10.0.0.2/8 dev h2-eth0")));
        assert!(!lab.shells.contains_key("s1"));
    }

    #[test]
    fn start_ping_and_stop() {
        let mut lab = try_build(switched_hosts(), |name, shell| {
            if name == "h2" {
                shell.fail_on("ping -c1 -W1 10.0.0.1")
            } else {
                shell
            }
        });
        let fabric = lab.fabric();
        assert!(!fabric.is_started());
        fabric.start().unwrap();
        assert!(fabric.is_started());
        assert_eq!(fabric.ping_all().unwrap(), 1);
        assert!(lab.commands("h1").contains(&String::from("ping -c1 -W1 10.0.0.2")));

        lab.fabric().stop();
        assert!(lab.fabric().nodes().is_empty());
        let host = lab.host_commands();
        assert!(host.contains(&String::from("ip link set dev s1 up")));
        assert!(host.contains(&String::from("ip link del s1-eth1")));
        assert_eq!(host.last().unwrap(), "ip link del s1");

        // stopping again does nothing
        let n = lab.host_commands().len();
        lab.fabric().stop();
        assert_eq!(lab.host_commands().len(), n);
    }

    #[test]
    fn router_and_host() {
        let mut g = TopologyGraph::new();
        let attrs = RouterAttrs::new([Daemon::Ospfd]).with_commands(["configure terminal"]);
        build_router_and_host(&mut g, "r1", "h1", Ipv4Addr::new(192, 168, 0, 0), attrs).unwrap();
        let mut lab = build(Topology::new(g));

        let context = {
            let r1 = lab.fabric().node("r1").unwrap();
            assert_eq!(r1.ip().unwrap().to_string(), "192.168.0.1/24");
            let router = r1.router().unwrap();
            assert_eq!(router.state(), RouterState::Running);
            router.context().to_string()
        };
        let r1 = lab.commands("r1");
        assert!(r1.contains(&String::from("sysctl net.ipv4.ip_forward=1")));
        assert!(r1.contains(&String::from("ip link set dev r1-eth0 mtu 1600")));
        assert!(r1.contains(&format!("/usr/lib/frr/frrinit.sh start {}", context)));
        assert!(r1
            .last()
            .unwrap()
            .ends_with("-c 'configure terminal' -c 'end' -c 'write integrated'"));
        assert!(lab.commands("h1").contains(&String::from("ip route add default via 192.168.0.1")));

        let pathspace: PathBuf = lab.config.frr.base_pathspace.join(&context);
        assert!(pathspace.join("daemons").is_file());
        lab.fabric().stop();
        assert!(lab.commands("r1").contains(&String::from("sysctl net.ipv4.ip_forward=0")));
        assert!(!pathspace.exists());
    }

    #[test]
    fn post_configure_once() {
        let mut lab = build(MplsTopo::build().unwrap());
        assert!(matches!(lab.fabric().post_configure(), Err(Error::NotStarted)));
        lab.fabric().start().unwrap();
        lab.fabric().post_configure().unwrap();
        assert!(matches!(lab.fabric().post_configure(), Err(Error::AlreadyPostConfigured)));

        let r1 = lab.commands("r1");
        let discovery = r1.last().unwrap();
        assert!(discovery.contains("-c 'discovery transport-address 192.168.0.1'"));
        assert!(discovery
            .contains("-c 'interface r1-eth0' -c 'exit' -c 'interface r1-eth1' -c 'exit'"));
        // the default interface of r2 faces r3
        let r2 = lab.commands("r2");
        assert!(r2.last().unwrap().contains("-c 'discovery transport-address 192.168.2.1'"));
        // hosts are left alone
        assert!(!lab.commands("h1").iter().any(|c| c.contains("vtysh")));
    }

    #[test]
    fn overlay_node() {
        let mut g = TopologyGraph::new();
        let spec = NodeSpec::new("h1", NodeRole::OverlayLeaf(OverlayAttrs::default()))
            .with_private_dir(PrivateDir::Bind {
                mount_point: PathBuf::from("/var/lib/zerotier-one/moons.d"),
                source: PathBuf::from("./moons.d"),
            });
        g.add_node(spec).unwrap();
        g.add_host("h2", None, None).unwrap();
        g.add_link("h1", "h2", LinkOptions::default()).unwrap();
        let mut lab = try_build(Topology::new(g), |_, shell| {
            shell
                .respond("zerotier-cli info | cut", "deadbeef00\n")
                .respond("authtoken.secret", "token\n")
                .respond("zerotier-one.pid", "55\n")
        });

        let h1 = lab.commands("h1");
        assert_eq!(
            h1[1..4],
            [
                String::from("ip link set lo up"),
                String::from(
                    "mkdir -p '/var/lib/zerotier-one' && \
                     mount -t tmpfs tmpfs '/var/lib/zerotier-one'"
                ),
                String::from(
                    "mkdir -p './moons.d' '/var/lib/zerotier-one/moons.d' && mount --bind \
                     './moons.d' '/var/lib/zerotier-one/moons.d'"
                ),
            ]
        );
        let fabric = lab.fabric();
        let overlay = fabric.node("h1").unwrap().overlay().unwrap();
        assert_eq!(overlay.node_id(), Some("deadbeef00"));
        assert_eq!(overlay.agent_pid(), Some(55));
        assert!(fabric.node("h2").unwrap().overlay().is_none());

        fabric.stop();
        assert!(lab.commands("h1").contains(&String::from("kill -KILL 55")));
    }

    #[test]
    fn wrong_role_and_unknown_node() {
        let mut lab = build(switched_hosts());
        let fabric = lab.fabric();
        assert!(matches!(fabric.vtysh("h1", &["router ospf"]), Err(Error::WrongRole { .. })));
        let h1 = fabric.node_mut("h1").unwrap();
        assert!(matches!(h1.restart_overlay(), Err(Error::WrongRole { .. })));
        assert!(matches!(fabric.node("s1"), Err(Error::UnknownNode(_))));
        assert!(matches!(fabric.node("h3"), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn failed_build_is_torn_down() {
        let mut g = TopologyGraph::new();
        build_router_and_host(
            &mut g,
            "r1",
            "h1",
            Ipv4Addr::new(192, 168, 0, 0),
            RouterAttrs::new([Daemon::Ospfd]),
        )
        .unwrap();
        let lab = try_build(Topology::new(g), |name, shell| {
            if name == "r1" {
                shell.fail_on("frrinit.sh start")
            } else {
                shell
            }
        });
        match &lab.fabric {
            Err(Error::Provisioning { node, step, .. }) => {
                assert_eq!(node, "r1");
                assert_eq!(step, "start daemons");
            }
            r => panic!("unexpected result: {:?}", r.as_ref().map(|_| ())),
        }
        // the router was terminated while dropping the fabric
        assert!(lab.commands("r1").contains(&String::from("sysctl net.ipv4.ip_forward=0")));
    }
}

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

//! Module containing all type definitions of the topology graph

use ipnet::Ipv4Net;
use petgraph::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub(crate) type IndexType = u32;
/// Node Identification (and index into the graph)
pub type NodeId = NodeIndex<IndexType>;
/// Link Identification (and index into the graph)
pub type LinkId = EdgeIndex<IndexType>;

/// Every link in the lab is shaped to this rate, no matter what the caller asks for.
pub const LINK_BANDWIDTH_CEILING_MBIT: u32 = 1000;

/// Topology Error
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum TopologyError {
    /// A node with the same name already exists
    #[error("Node {0} already exists in the topology")]
    DuplicateNode(String),
    /// The node does not exist
    #[error("Node {0} is not part of the topology")]
    UnknownNode(String),
    /// Two links would create an interface with the same name
    #[error("Interface {0} already exists")]
    DuplicateInterface(String),
    /// A link must connect two different nodes
    #[error("Cannot connect node {0} to itself")]
    SelfLoop(String),
}

/// FRRouting daemon, as it appears in the `daemons` file of a pathspace. `zebra` and `staticd`
/// are always started by `frrinit.sh` and are therefore not part of this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Daemon {
    /// BGP
    Bgpd,
    /// OSPFv2
    Ospfd,
    /// OSPFv3
    Ospf6d,
    /// RIP
    Ripd,
    /// RIPng
    Ripngd,
    /// IS-IS
    Isisd,
    /// PIM
    Pimd,
    /// LDP, the label distribution daemon. Enabling it turns on MPLS label processing.
    Ldpd,
    /// NHRP
    Nhrpd,
    /// EIGRP
    Eigrpd,
    /// Babel
    Babeld,
    /// Policy based routing
    Pbrd,
    /// BFD
    Bfdd,
    /// OpenFabric
    Fabricd,
    /// VRRP
    Vrrpd,
}

impl Daemon {
    /// Name of the daemon in the `daemons` file.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bgpd => "bgpd",
            Self::Ospfd => "ospfd",
            Self::Ospf6d => "ospf6d",
            Self::Ripd => "ripd",
            Self::Ripngd => "ripngd",
            Self::Isisd => "isisd",
            Self::Pimd => "pimd",
            Self::Ldpd => "ldpd",
            Self::Nhrpd => "nhrpd",
            Self::Eigrpd => "eigrpd",
            Self::Babeld => "babeld",
            Self::Pbrd => "pbrd",
            Self::Bfdd => "bfdd",
            Self::Fabricd => "fabricd",
            Self::Vrrpd => "vrrpd",
        }
    }

    /// All daemons that can be enabled
    pub fn all() -> [Daemon; 15] {
        [
            Self::Bgpd,
            Self::Ospfd,
            Self::Ospf6d,
            Self::Ripd,
            Self::Ripngd,
            Self::Isisd,
            Self::Pimd,
            Self::Ldpd,
            Self::Nhrpd,
            Self::Eigrpd,
            Self::Babeld,
            Self::Pbrd,
            Self::Bfdd,
            Self::Fabricd,
            Self::Vrrpd,
        ]
    }
}

impl fmt::Display for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Daemon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|d| d.name() == s)
            .copied()
            .ok_or_else(|| format!("Unknown FRRouting daemon: {}", s))
    }
}

/// Set of enabled daemons, ordered by name in the `daemons` file.
pub type DaemonSet = BTreeSet<Daemon>;

/// Virtual routing table, enslaving a set of interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vrf {
    /// Name of the VRF device
    pub name: String,
    /// Interfaces which are enslaved to the VRF, in declaration order
    pub interfaces: Vec<String>,
}

/// Attributes of an FRRouting router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterAttrs {
    /// Daemons to enable
    pub daemons: DaemonSet,
    /// Scripted `vtysh` command sequence, applied once the daemons are up
    pub commands: Vec<String>,
    /// VRFs in declaration order. The routing table ids are assigned from 1 in this order.
    pub vrfs: Vec<Vrf>,
}

impl RouterAttrs {
    /// Create the attributes of a router running the given daemons.
    pub fn new(daemons: impl IntoIterator<Item = Daemon>) -> Self {
        Self { daemons: daemons.into_iter().collect(), commands: Vec::new(), vrfs: Vec::new() }
    }

    /// Set the scripted command sequence
    pub fn with_commands<S: Into<String>>(mut self, commands: impl IntoIterator<Item = S>) -> Self {
        self.commands = commands.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a VRF with its enslaved interfaces.
    pub fn with_vrf<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        interfaces: impl IntoIterator<Item = S>,
    ) -> Self {
        self.vrfs.push(Vrf {
            name: name.into(),
            interfaces: interfaces.into_iter().map(|i| i.into()).collect(),
        });
        self
    }

    /// Returns true if the daemon is enabled
    pub fn has_daemon(&self, daemon: Daemon) -> bool {
        self.daemons.contains(&daemon)
    }
}

/// Attributes of a switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchAttrs {
    /// Run the spanning tree protocol on the bridge. Required as soon as switches form a loop.
    pub stp: bool,
}

/// ZeroTier trusted path: traffic on this physical network is neither encrypted nor
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedPath {
    /// Physical network
    pub net: Ipv4Net,
    /// Trusted path id, must be the same on all nodes sharing the path
    pub id: u64,
}

/// Attributes of a ZeroTier node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayAttrs {
    /// Trusted paths written to `local.conf`
    pub trusted_paths: Vec<TrustedPath>,
}

/// Directory which is private to a node. Mounts are done inside the node's mount namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateDir {
    /// Empty tmpfs mounted on the directory
    Tmpfs(PathBuf),
    /// A directory of the host, bind mounted on the directory
    Bind {
        /// Where the directory appears inside the node
        mount_point: PathBuf,
        /// Directory on the host
        source: PathBuf,
    },
}

impl PrivateDir {
    /// Where the directory appears inside the node
    pub fn mount_point(&self) -> &PathBuf {
        match self {
            Self::Tmpfs(p) => p,
            Self::Bind { mount_point, .. } => mount_point,
        }
    }
}

/// Role of a node, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    /// Plain host
    Host,
    /// FRRouting router
    Router(RouterAttrs),
    /// Linux bridge in the root namespace
    Switch(SwitchAttrs),
    /// ZeroTier node which generates a moon, orbited by all other overlay nodes
    OverlayRoot(OverlayAttrs),
    /// ZeroTier node acting as network controller
    OverlayController(OverlayAttrs),
    /// ZeroTier node joining the network
    OverlayLeaf(OverlayAttrs),
}

impl NodeRole {
    /// Returns true if the node is a router
    pub fn is_router(&self) -> bool {
        matches!(self, Self::Router(_))
    }

    /// Returns true if the node is a switch
    pub fn is_switch(&self) -> bool {
        matches!(self, Self::Switch(_))
    }

    /// Returns true if the node is a plain host
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// Returns true if the node runs a ZeroTier agent
    pub fn is_overlay(&self) -> bool {
        self.overlay_attrs().is_some()
    }

    /// Returns the router attributes, if the node is a router
    pub fn router_attrs(&self) -> Option<&RouterAttrs> {
        match self {
            Self::Router(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Returns the overlay attributes, if the node runs a ZeroTier agent
    pub fn overlay_attrs(&self) -> Option<&OverlayAttrs> {
        match self {
            Self::OverlayRoot(attrs)
            | Self::OverlayController(attrs)
            | Self::OverlayLeaf(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Short name of the role
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Router(_) => "router",
            Self::Switch(_) => "switch",
            Self::OverlayRoot(_) => "overlay root",
            Self::OverlayController(_) => "overlay controller",
            Self::OverlayLeaf(_) => "overlay leaf",
        }
    }
}

/// # Node Specification
/// Declarative description of a node. The role cannot be changed after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    name: String,
    role: NodeRole,
    pub(crate) ip: Option<Ipv4Net>,
    default_route: Option<Ipv4Addr>,
    private_dirs: Vec<PrivateDir>,
}

impl NodeSpec {
    /// Create a new node specification
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self { name: name.into(), role, ip: None, default_route: None, private_dirs: Vec::new() }
    }

    /// Set the address of the node's default interface
    pub fn with_ip(mut self, ip: Ipv4Net) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the default route of the node
    pub fn with_default_route(mut self, via: Ipv4Addr) -> Self {
        self.default_route = Some(via);
        self
    }

    /// Add a private directory
    pub fn with_private_dir(mut self, dir: PrivateDir) -> Self {
        self.private_dirs.push(dir);
        self
    }

    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of the node
    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    /// Address of the default interface
    pub fn ip(&self) -> Option<Ipv4Net> {
        self.ip
    }

    /// Default route
    pub fn default_route(&self) -> Option<Ipv4Addr> {
        self.default_route
    }

    /// Private directories, in mount order
    pub fn private_dirs(&self) -> &[PrivateDir] {
        &self.private_dirs
    }
}

/// Endpoint of a link, as passed to [`TopologyGraph::add_link`](super::TopologyGraph::add_link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEndpointSpec {
    pub(crate) node: String,
    pub(crate) intf_name: Option<String>,
    pub(crate) ip: Option<Ipv4Net>,
}

impl LinkEndpointSpec {
    /// Endpoint at the given node, with default interface name and address
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into(), intf_name: None, ip: None }
    }

    /// Use an explicit interface name instead of `<node>-eth<port>`
    pub fn intf(mut self, name: impl Into<String>) -> Self {
        self.intf_name = Some(name.into());
        self
    }

    /// Address of the interface
    pub fn ip(mut self, ip: Ipv4Net) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Name of the node
    pub fn node(&self) -> &str {
        &self.node
    }
}

impl From<&str> for LinkEndpointSpec {
    fn from(node: &str) -> Self {
        Self::new(node)
    }
}

impl From<String> for LinkEndpointSpec {
    fn from(node: String) -> Self {
        Self::new(node)
    }
}

impl From<&String> for LinkEndpointSpec {
    fn from(node: &String) -> Self {
        Self::new(node.as_str())
    }
}

/// Options of a link. The bandwidth is accepted for compatibility, but always replaced by
/// [`LINK_BANDWIDTH_CEILING_MBIT`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    /// Requested bandwidth
    pub bandwidth_mbit: Option<u32>,
}

/// Endpoint of a link stored in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEndpoint {
    /// Node of the endpoint
    pub node: NodeId,
    /// Port number on the node, assigned in link insertion order
    pub port: u32,
    pub(crate) node_name: String,
    pub(crate) intf_name: Option<String>,
    /// Address of the interface, if given explicitly
    pub ip: Option<Ipv4Net>,
}

impl LinkEndpoint {
    /// Resolved interface name: the explicit one, or `<node>-eth<port>`.
    pub fn intf_name(&self) -> String {
        match &self.intf_name {
            Some(name) => name.clone(),
            None => format!("{}-eth{}", self.node_name, self.port),
        }
    }

    /// Name of the node
    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

/// # Link Specification
/// Point-to-point link between two nodes. The bandwidth is always the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    endpoints: [LinkEndpoint; 2],
    bandwidth_mbit: u32,
}

impl LinkSpec {
    pub(crate) fn new(a: LinkEndpoint, b: LinkEndpoint) -> Self {
        Self { endpoints: [a, b], bandwidth_mbit: LINK_BANDWIDTH_CEILING_MBIT }
    }

    /// Both endpoints, in the order they were given
    pub fn endpoints(&self) -> &[LinkEndpoint; 2] {
        &self.endpoints
    }

    /// Effective bandwidth of the link
    pub fn bandwidth_mbit(&self) -> u32 {
        self.bandwidth_mbit
    }

    /// Endpoint at the given node.
    pub fn endpoint_at(&self, node: NodeId) -> Option<&LinkEndpoint> {
        self.endpoints.iter().find(|e| e.node == node)
    }

    /// Endpoint on the other side of the given node.
    pub fn peer_of(&self, node: NodeId) -> Option<&LinkEndpoint> {
        if self.endpoints[0].node == node {
            Some(&self.endpoints[1])
        } else if self.endpoints[1].node == node {
            Some(&self.endpoints[0])
        } else {
            None
        }
    }
}

/// Interface of a node, with its resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Name of the interface
    pub name: String,
    /// Port number
    pub port: u32,
    /// Address: the one given on the link, or the node's address on its first interface.
    pub ip: Option<Ipv4Net>,
    /// Link this interface belongs to
    pub link: LinkId,
}

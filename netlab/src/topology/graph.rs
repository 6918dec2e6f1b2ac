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

//! # Topology Graph
//! Undirected graph of [`NodeSpec`]s connected by [`LinkSpec`]s. Nodes and links are never
//! removed, so the graph indices reflect the insertion order, which is used to assign port
//! numbers and default addresses.

use super::types::*;
use ipnet::Ipv4Net;
use log::*;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Undirected;
use std::collections::HashMap;
use std::net::Ipv4Addr;

type Graph = StableGraph<NodeSpec, LinkSpec, Undirected, IndexType>;

/// # Topology Graph
/// Declarative description of a lab. Building the graph has no side effects.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    graph: Graph,
    names: HashMap<String, NodeId>,
    next_port: HashMap<NodeId, u32>,
}

impl TopologyGraph {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the topology, and return its name.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<String, TopologyError> {
        let name = spec.name().to_string();
        if self.names.contains_key(&name) {
            return Err(TopologyError::DuplicateNode(name));
        }
        // switch ports start at 1, all other nodes at 0
        let first_port = if spec.role().is_switch() { 1 } else { 0 };
        let id = self.graph.add_node(spec);
        self.names.insert(name.clone(), id);
        self.next_port.insert(id, first_port);
        Ok(name)
    }

    /// Add a plain host
    pub fn add_host(
        &mut self,
        name: impl Into<String>,
        ip: Option<Ipv4Net>,
        default_route: Option<Ipv4Addr>,
    ) -> Result<String, TopologyError> {
        let mut spec = NodeSpec::new(name, NodeRole::Host);
        if let Some(ip) = ip {
            spec = spec.with_ip(ip);
        }
        if let Some(via) = default_route {
            spec = spec.with_default_route(via);
        }
        self.add_node(spec)
    }

    /// Add an FRRouting router
    pub fn add_router(
        &mut self,
        name: impl Into<String>,
        attrs: RouterAttrs,
        ip: Option<Ipv4Net>,
    ) -> Result<String, TopologyError> {
        let mut spec = NodeSpec::new(name, NodeRole::Router(attrs));
        if let Some(ip) = ip {
            spec = spec.with_ip(ip);
        }
        self.add_node(spec)
    }

    /// Add a switch
    pub fn add_switch(
        &mut self,
        name: impl Into<String>,
        stp: bool,
    ) -> Result<String, TopologyError> {
        self.add_node(NodeSpec::new(name, NodeRole::Switch(SwitchAttrs { stp })))
    }

    /// Add a link between two nodes. A bandwidth in `options` is discarded, every link is shaped to
    /// [`LINK_BANDWIDTH_CEILING_MBIT`].
    pub fn add_link(
        &mut self,
        a: impl Into<LinkEndpointSpec>,
        b: impl Into<LinkEndpointSpec>,
        options: LinkOptions,
    ) -> Result<LinkId, TopologyError> {
        let a = a.into();
        let b = b.into();
        let a_id = self.node_id(a.node())?;
        let b_id = self.node_id(b.node())?;
        if a_id == b_id {
            return Err(TopologyError::SelfLoop(a.node().to_string()));
        }

        if let Some(bw) = options.bandwidth_mbit {
            if bw != LINK_BANDWIDTH_CEILING_MBIT {
                debug!(
                    "Ignoring bandwidth of {} Mbit/s on link {} -- {}, using {} Mbit/s",
                    bw,
                    a.node(),
                    b.node(),
                    LINK_BANDWIDTH_CEILING_MBIT
                );
            }
        }

        let ep_a = self.make_endpoint(a_id, a)?;
        let ep_b = self.make_endpoint(b_id, b)?;
        if ep_a.intf_name() == ep_b.intf_name() {
            // both interfaces live in the root namespace until they are moved into their nodes
            return Err(TopologyError::DuplicateInterface(ep_a.intf_name()));
        }

        // only commit the ports once both endpoints are valid
        *self.next_port.entry(a_id).or_default() += 1;
        *self.next_port.entry(b_id).or_default() += 1;

        Ok(self.graph.add_edge(a_id, b_id, LinkSpec::new(ep_a, ep_b)))
    }

    fn make_endpoint(
        &self,
        node: NodeId,
        spec: LinkEndpointSpec,
    ) -> Result<LinkEndpoint, TopologyError> {
        let port = self.next_port.get(&node).copied().unwrap_or_default();
        let LinkEndpointSpec { node: node_name, intf_name, ip } = spec;
        let endpoint = LinkEndpoint { node, port, node_name, intf_name, ip };
        let name = endpoint.intf_name();
        if self.interfaces_by_id(node).iter().any(|i| i.name == name) {
            return Err(TopologyError::DuplicateInterface(name));
        }
        Ok(endpoint)
    }

    /// Get the id of a node
    pub fn node_id(&self, name: impl AsRef<str>) -> Result<NodeId, TopologyError> {
        self.names
            .get(name.as_ref())
            .copied()
            .ok_or_else(|| TopologyError::UnknownNode(name.as_ref().to_string()))
    }

    /// Get the specification of a node
    pub fn node(&self, name: impl AsRef<str>) -> Result<&NodeSpec, TopologyError> {
        let id = self.node_id(name)?;
        Ok(&self.graph[id])
    }

    /// Get the specification of a node by its id
    pub fn node_by_id(&self, id: NodeId) -> Option<&NodeSpec> {
        self.graph.node_weight(id)
    }

    /// All node ids in insertion order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().collect()
    }

    /// All node names in insertion order
    pub fn nodes(&self) -> Vec<String> {
        self.nodes_where(|_| true)
    }

    /// Names of all nodes matching the predicate, in insertion order
    pub fn nodes_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&NodeSpec) -> bool,
    {
        self.graph
            .node_indices()
            .map(|id| &self.graph[id])
            .filter(|n| predicate(n))
            .map(|n| n.name().to_string())
            .collect()
    }

    /// Names of all routers, in insertion order
    pub fn routers(&self) -> Vec<String> {
        self.nodes_where(|n| n.role().is_router())
    }

    /// All links in insertion order
    pub fn links(&self) -> Vec<&LinkSpec> {
        self.graph.edge_indices().map(|e| &self.graph[e]).collect()
    }

    /// All links of a node, ordered by the port number on that node
    pub fn links_of(&self, name: impl AsRef<str>) -> Result<Vec<&LinkSpec>, TopologyError> {
        let id = self.node_id(name)?;
        let mut links: Vec<(u32, &LinkSpec)> = self
            .graph
            .edges(id)
            .map(|e| e.weight())
            .filter_map(|l| l.endpoint_at(id).map(|ep| (ep.port, l)))
            .collect();
        links.sort_by_key(|(port, _)| *port);
        Ok(links.into_iter().map(|(_, l)| l).collect())
    }

    /// Interfaces of a node, ordered by port number, with their resolved address.
    ///
    /// The node's own address goes to its default interface. An address given explicitly on a
    /// link endpoint takes precedence over it, so automatic addressing of a node never replaces
    /// the addresses of its links.
    pub fn interfaces(&self, name: impl AsRef<str>) -> Result<Vec<Interface>, TopologyError> {
        let id = self.node_id(name)?;
        Ok(self.interfaces_by_id(id))
    }

    fn interfaces_by_id(&self, id: NodeId) -> Vec<Interface> {
        let mut intfs: Vec<Interface> = self
            .graph
            .edges(id)
            .filter_map(|e| {
                e.weight().endpoint_at(id).map(|ep| Interface {
                    name: ep.intf_name(),
                    port: ep.port,
                    ip: ep.ip,
                    link: e.id(),
                })
            })
            .collect();
        intfs.sort_by_key(|i| i.port);
        if let (Some(first), Some(ip)) = (intfs.first_mut(), self.graph[id].ip()) {
            if first.ip.is_none() {
                first.ip = Some(ip);
            }
        }
        intfs
    }

    /// Interface names of a node, ordered by port number
    pub fn intf_names(&self, name: impl AsRef<str>) -> Result<Vec<String>, TopologyError> {
        Ok(self.interfaces(name)?.into_iter().map(|i| i.name).collect())
    }

    /// Default interface of a node, which is the one with the lowest port number.
    pub fn default_intf_name(
        &self,
        name: impl AsRef<str>,
    ) -> Result<Option<String>, TopologyError> {
        Ok(self.intf_names(name)?.into_iter().next())
    }

    /// Give every node without address (except switches) an address from `base`. The n-th
    /// non-switch node (counting from 1, in insertion order) receives the n-th host address,
    /// whether it needs it or not, so adding an explicit address never shifts the others.
    pub fn assign_addresses(&mut self, base: Ipv4Net) {
        let network = u32::from(base.network());
        let ids: Vec<NodeId> = self.graph.node_indices().collect();
        let mut counter: u32 = 0;
        for id in ids {
            if self.graph[id].role().is_switch() {
                continue;
            }
            counter += 1;
            if self.graph[id].ip.is_some() {
                continue;
            }
            let addr = Ipv4Addr::from(network.wrapping_add(counter));
            if !base.contains(&addr) || addr == base.broadcast() {
                let name = self.graph[id].name();
                warn!("IP base {} exhausted, {} stays without address", base, name);
                continue;
            }
            match Ipv4Net::new(addr, base.prefix_len()) {
                Ok(ip) => {
                    debug!("Assigning {} to {}", ip, self.graph[id].name());
                    self.graph[id].ip = Some(ip);
                }
                Err(e) => warn!("Cannot assign an address to {}: {}", self.graph[id].name(), e),
            }
        }
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }
}
